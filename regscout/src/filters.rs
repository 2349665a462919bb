//! Exclusion of noisy registry areas from the final report.
//!
//! Some vendors scatter thousands of keys across every hive (browser updaters, insider
//! build telemetry) and drown out the interesting hits. The blacklist removes any match
//! whose key path contains one of its entries. It is applied once after the traversal
//! instead of pruning subtrees during it, so the raw traversal output stays complete.
//!
//! Entries are lowercased when the blacklist is built and compared against the
//! lowercased key path, so `"Google"` and `"google"` behave the same.
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::results::MatchRecord;

/// Entries applied when no blacklist is configured
pub const DEFAULT_BLACKLIST: [&str; 3] = ["windowsselfhost", "edge", "google"];

/// Lowercased substrings that exclude a key path from the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Blacklist {
    entries: Vec<String>,
}

impl Blacklist {
    /// Builds a blacklist, lowercasing every entry and dropping empty ones.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for entry in entries {
            let entry = entry.as_ref();
            if entry.is_empty() {
                // An empty entry would exclude every path.
                warn!("Ignoring empty blacklist entry");
                continue;
            }
            let lowered = entry.to_lowercase();
            if !normalized.contains(&lowered) {
                normalized.push(lowered);
            }
        }
        Self {
            entries: normalized,
        }
    }

    /// A blacklist that excludes nothing
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks whether `key_path` falls under any blacklisted area
    pub fn is_blacklisted(&self, key_path: &str) -> bool {
        if self.entries.is_empty() {
            return false;
        }
        let lowered = key_path.to_lowercase();
        self.entries.iter().any(|entry| lowered.contains(entry.as_str()))
    }

    /// Keeps only the records whose key path is not blacklisted, preserving order
    pub fn retain_allowed(&self, records: Vec<MatchRecord>) -> Vec<MatchRecord> {
        records
            .into_iter()
            .filter(|record| !self.is_blacklisted(&record.key_path))
            .collect()
    }
}

impl Default for Blacklist {
    fn default() -> Self {
        Self::new(DEFAULT_BLACKLIST)
    }
}

impl From<Vec<String>> for Blacklist {
    fn from(entries: Vec<String>) -> Self {
        Self::new(entries)
    }
}

impl From<Blacklist> for Vec<String> {
    fn from(blacklist: Blacklist) -> Self {
        blacklist.entries
    }
}
