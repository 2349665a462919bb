use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

use super::aggregator::finalize;
use super::dispatcher::{dispatch, SearchMode};
use super::matcher::ValueMatcher;
use crate::config::SearchConfig;
use crate::errors::{SearchError, SearchResult};
use crate::filters::Blacklist;
use crate::history::SearchHistory;
use crate::metrics::{TraversalMetrics, TraversalStats};
use crate::results::SearchReport;
use crate::store::{Hive, RegistryStore};

/// One search run: target, blacklist, roots and the progress of the walk.
///
/// A searcher runs once. Other threads may poll [`is_finished`](Self::is_finished)
/// and [`progress`](Self::progress) while [`run`](Self::run) is blocked.
#[derive(Debug)]
pub struct RegistrySearcher {
    matcher: ValueMatcher,
    blacklist: Blacklist,
    roots: Vec<Hive>,
    mode: SearchMode,
    metrics: TraversalMetrics,
    started: AtomicBool,
    finished: AtomicBool,
}

impl RegistrySearcher {
    /// Creates a searcher over the default roots in multi-worker mode
    pub fn new(target: &str, blacklist: Blacklist) -> Self {
        Self {
            matcher: ValueMatcher::new(target),
            blacklist,
            roots: Hive::DEFAULT_ROOTS.to_vec(),
            mode: SearchMode::default(),
            metrics: TraversalMetrics::new(),
            started: AtomicBool::new(false),
            finished: AtomicBool::new(false),
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(&config.target, config.blacklist.clone())
            .with_roots(config.roots.clone())
            .with_mode(config.mode)
    }

    pub fn with_roots(mut self, roots: Vec<Hive>) -> Self {
        self.roots = roots;
        self
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    /// The lowercased search target
    pub fn target(&self) -> &str {
        self.matcher.target()
    }

    /// True once the report has been built and filtered
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }

    /// Live counters of the running walk
    pub fn progress(&self) -> TraversalStats {
        self.metrics.get_stats()
    }

    /// Walks every root, filters the matches, records the report in `history` and
    /// returns it.
    ///
    /// Node-level failures never fail the run; the only errors are being called a
    /// second time and being unable to start the workers.
    pub fn run<S: RegistryStore>(
        &self,
        store: &S,
        history: &SearchHistory,
    ) -> SearchResult<SearchReport> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(SearchError::AlreadyStarted);
        }
        info!(
            "Starting search for '{}' in {:?}",
            self.matcher.target(),
            self.roots
        );

        let raw = dispatch(store, &self.roots, self.mode, &self.matcher, &self.metrics)?;
        let report = finalize(raw, &self.blacklist)?;
        self.finished.store(true, Ordering::Release);
        history.record(report.rendered());

        self.metrics.log_stats();
        info!("{}", report.summary);
        Ok(report)
    }
}
