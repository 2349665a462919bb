use tracing::{debug, trace, warn};

use super::matcher::ValueMatcher;
use crate::errors::{SearchError, SearchResult};
use crate::metrics::TraversalMetrics;
use crate::results::{MatchRecord, MatchSet};
use crate::store::{join_path, RegistryKey};

/// Depth-first walker over one registry subtree.
///
/// The walker only produces: matching records go into the shared [`MatchSet`], failures
/// into the shared failed-node counter. Nothing is filtered here.
///
/// Every child is handled inside its own error boundary. A child that cannot be
/// opened, listed or read is counted once and skipped, and the loop moves on to its
/// next sibling. Handles are dropped at the end of each child's visit.
#[derive(Debug)]
pub struct TreeWalker<'a> {
    matcher: &'a ValueMatcher,
    matches: &'a MatchSet,
    metrics: &'a TraversalMetrics,
}

impl<'a> TreeWalker<'a> {
    pub fn new(
        matcher: &'a ValueMatcher,
        matches: &'a MatchSet,
        metrics: &'a TraversalMetrics,
    ) -> Self {
        Self {
            matcher,
            matches,
            metrics,
        }
    }

    /// Visits every descendant of `key`.
    ///
    /// Only the enumeration of `key`'s own children can fail here; failures below it
    /// are absorbed and counted.
    pub fn visit<K: RegistryKey>(&self, key: &K) -> SearchResult<()> {
        let names = key.subkey_names()?;
        for name in names {
            if let Err(e) = self.visit_child(key, &name) {
                let path = join_path(key.name(), &name);
                if e.is_node_access() {
                    debug!("Skipping {}: {}", path, e);
                } else {
                    warn!("Unexpected failure under {}: {}", path, e);
                }
                self.metrics.record_failed_node();
            }
        }
        Ok(())
    }

    fn visit_child<K: RegistryKey>(&self, parent: &K, name: &str) -> SearchResult<()> {
        let child = parent
            .open_subkey(name)?
            .ok_or_else(|| SearchError::key_not_found(join_path(parent.name(), name)))?;
        self.metrics.record_key_opened();
        trace!("Visiting {}", child.name());

        if child.subkey_count()? == 0 {
            self.scan_values(&child)
        } else {
            self.visit(&child)
        }
    }

    /// Reads every value of a leaf. Matches are published only if the whole scan
    /// succeeds, so a failing leaf contributes nothing.
    fn scan_values<K: RegistryKey>(&self, leaf: &K) -> SearchResult<()> {
        let names = leaf.value_names()?;
        let mut found = Vec::new();
        for value_name in &names {
            let value = leaf.value(value_name)?;
            if self.matcher.is_match(value_name, value.as_ref()) {
                let payload = value
                    .as_ref()
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                found.push(MatchRecord::new(leaf.name(), value_name.as_str(), payload));
            }
        }
        self.metrics.record_leaf(names.len() as u64);
        self.metrics.record_matches(found.len() as u64);
        self.matches.extend(found);
        Ok(())
    }
}
