use std::sync::{Arc, PoisonError, RwLock};

/// Rendered reports of every search run in this process, oldest first.
///
/// Owned by the host and passed by reference to whatever records or reads runs.
/// Entries are immutable once recorded and are never pruned.
#[derive(Debug, Default)]
pub struct SearchHistory {
    entries: RwLock<Vec<Arc<str>>>,
}

impl SearchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one rendered report
    pub fn record(&self, rendered: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::from(rendered));
    }

    pub fn count(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Every recorded report, oldest first
    pub fn all(&self) -> Vec<Arc<str>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_record_and_query() {
        let history = SearchHistory::new();
        assert!(history.is_empty());

        history.record("first");
        history.record("second");
        assert_eq!(history.count(), 2);

        let all = history.all();
        assert_eq!(&*all[0], "first");
        assert_eq!(&*all[1], "second");
    }

    #[test]
    fn test_reads_alongside_writes() {
        let history = SearchHistory::new();
        history.record("seed");
        thread::scope(|s| {
            s.spawn(|| {
                for i in 0..100 {
                    history.record(&format!("run {}", i));
                }
            });
            s.spawn(|| {
                for _ in 0..100 {
                    let snapshot = history.all();
                    assert_eq!(&*snapshot[0], "seed");
                }
            });
        });
        assert_eq!(history.count(), 101);
    }
}
