use crate::store::RegistryValue;

/// Case-insensitive substring predicate over value names and string payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueMatcher {
    target: String,
}

impl ValueMatcher {
    /// Creates a matcher for `target`. The target is lowercased once here and
    /// otherwise used exactly as typed; it is not trimmed.
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_lowercase(),
        }
    }

    /// The lowercased target
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Tests one piece of text.
    pub fn matches_text(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.target)
    }

    /// Tests a value: its name always, its payload only when it is a string.
    pub fn is_match(&self, value_name: &str, value: Option<&RegistryValue>) -> bool {
        self.matches_text(value_name)
            || value
                .and_then(RegistryValue::as_str)
                .is_some_and(|payload| self.matches_text(payload))
    }
}
