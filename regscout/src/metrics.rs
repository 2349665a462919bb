use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Counters updated by every worker while a search runs.
///
/// Clones share the same counters, so a progress display can hold one while the
/// workers hold others.
#[derive(Debug, Clone)]
pub struct TraversalMetrics {
    keys_opened: Arc<AtomicU64>,
    leaves_scanned: Arc<AtomicU64>,
    values_inspected: Arc<AtomicU64>,
    raw_matches: Arc<AtomicU64>,
    failed_nodes: Arc<AtomicU64>,
    unavailable_roots: Arc<AtomicU64>,
}

impl TraversalMetrics {
    /// Creates a new TraversalMetrics instance
    pub fn new() -> Self {
        Self {
            keys_opened: Arc::new(AtomicU64::new(0)),
            leaves_scanned: Arc::new(AtomicU64::new(0)),
            values_inspected: Arc::new(AtomicU64::new(0)),
            raw_matches: Arc::new(AtomicU64::new(0)),
            failed_nodes: Arc::new(AtomicU64::new(0)),
            unavailable_roots: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_key_opened(&self) {
        self.keys_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a leaf whose values were read
    pub fn record_leaf(&self, values: u64) {
        self.leaves_scanned.fetch_add(1, Ordering::Relaxed);
        self.values_inspected.fetch_add(values, Ordering::Relaxed);
    }

    pub fn record_matches(&self, count: u64) {
        self.raw_matches.fetch_add(count, Ordering::Relaxed);
    }

    /// Records a key that could not be opened or read
    pub fn record_failed_node(&self) {
        let total = self.failed_nodes.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("Failed nodes so far: {}", total);
    }

    pub fn record_unavailable_root(&self) {
        self.unavailable_roots.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failed_nodes(&self) -> u64 {
        self.failed_nodes.load(Ordering::Relaxed)
    }

    /// Gets a point-in-time copy of every counter
    pub fn get_stats(&self) -> TraversalStats {
        TraversalStats {
            keys_opened: self.keys_opened.load(Ordering::Relaxed),
            leaves_scanned: self.leaves_scanned.load(Ordering::Relaxed),
            values_inspected: self.values_inspected.load(Ordering::Relaxed),
            raw_matches: self.raw_matches.load(Ordering::Relaxed),
            failed_nodes: self.failed_nodes.load(Ordering::Relaxed),
            unavailable_roots: self.unavailable_roots.load(Ordering::Relaxed),
        }
    }

    /// Logs the current counters
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Traversal stats:\n\
             Keys opened: {}\n\
             Leaves scanned: {}\n\
             Values inspected: {}\n\
             Raw matches: {}\n\
             Failed nodes: {}\n\
             Unavailable roots: {}",
            stats.keys_opened,
            stats.leaves_scanned,
            stats.values_inspected,
            stats.raw_matches,
            stats.failed_nodes,
            stats.unavailable_roots
        );
    }
}

impl Default for TraversalMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of [`TraversalMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalStats {
    pub keys_opened: u64,
    pub leaves_scanned: u64,
    pub values_inspected: u64,
    pub raw_matches: u64,
    pub failed_nodes: u64,
    pub unavailable_roots: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_counters() {
        let metrics = TraversalMetrics::new();
        metrics.record_key_opened();
        metrics.record_key_opened();
        metrics.record_leaf(3);
        metrics.record_matches(2);
        metrics.record_failed_node();
        metrics.record_unavailable_root();

        let stats = metrics.get_stats();
        assert_eq!(stats.keys_opened, 2);
        assert_eq!(stats.leaves_scanned, 1);
        assert_eq!(stats.values_inspected, 3);
        assert_eq!(stats.raw_matches, 2);
        assert_eq!(stats.failed_nodes, 1);
        assert_eq!(stats.unavailable_roots, 1);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = TraversalMetrics::new();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = metrics.clone();
                thread::spawn(move || {
                    for _ in 0..250 {
                        m.record_failed_node();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(metrics.failed_nodes(), 1000);
    }
}
