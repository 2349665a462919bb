use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::matcher::ValueMatcher;
use super::walker::TreeWalker;
use crate::errors::{SearchError, SearchResult};
use crate::metrics::TraversalMetrics;
use crate::results::{MatchSet, RawSearch};
use crate::store::{Hive, RegistryStore};

/// Stack size for walker threads; registry trees are walked recursively.
const WORKER_STACK_SIZE: usize = 8 * 1024 * 1024;

/// How roots are spread over worker threads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// One worker walks every root in turn
    Single,
    /// One worker per distinct root
    #[default]
    Multi,
}

impl SearchMode {
    pub fn parse(s: &str) -> Option<SearchMode> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" | "single-thread" | "singlethread" => Some(SearchMode::Single),
            "multi" | "multi-thread" | "multithread" => Some(SearchMode::Multi),
            _ => None,
        }
    }
}

/// Returns `roots` without repeats, keeping first occurrences in order.
pub fn distinct_roots(roots: &[Hive]) -> Vec<Hive> {
    let mut distinct = Vec::with_capacity(roots.len());
    for &hive in roots {
        if !distinct.contains(&hive) {
            distinct.push(hive);
        }
    }
    distinct
}

/// Walks `roots` on a dedicated pool and blocks until every worker has finished.
///
/// The caller's thread only waits. The clock starts before the first worker is
/// started and stops after the last one joins. The only error is failing to start
/// the workers; everything that goes wrong inside a tree ends up in the counters.
pub fn dispatch<S: RegistryStore>(
    store: &S,
    roots: &[Hive],
    mode: SearchMode,
    matcher: &ValueMatcher,
    metrics: &TraversalMetrics,
) -> SearchResult<RawSearch> {
    let roots = distinct_roots(roots);
    let worker_count = match mode {
        SearchMode::Single => 1,
        SearchMode::Multi => roots.len().max(1),
    };
    info!(
        "Dispatching {} root(s) over {} worker(s) ({:?} mode)",
        roots.len(),
        worker_count,
        mode
    );

    let start = Instant::now();
    let pool = ThreadPoolBuilder::new()
        .num_threads(worker_count)
        .thread_name(|i| format!("regscout-walker-{}", i))
        .stack_size(WORKER_STACK_SIZE)
        .build()
        .map_err(|e| SearchError::worker_spawn(e.to_string()))?;

    let matches = MatchSet::new();
    let unavailable = Mutex::new(Vec::new());

    let walk_root = |hive: Hive| {
        if let Err(e) = walk_one_root(store, hive, matcher, &matches, metrics) {
            warn!("{}", e);
            metrics.record_unavailable_root();
            unavailable
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(hive);
        }
    };

    pool.scope(|scope| match mode {
        SearchMode::Single => {
            scope.spawn(|_| roots.iter().copied().for_each(&walk_root));
        }
        SearchMode::Multi => {
            for &hive in &roots {
                let walk_root = &walk_root;
                scope.spawn(move |_| walk_root(hive));
            }
        }
    });

    let elapsed = start.elapsed();
    let mut unavailable_roots = unavailable
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    unavailable_roots.sort();

    Ok(RawSearch {
        matches: matches.into_inner(),
        failed_nodes: metrics.failed_nodes(),
        unavailable_roots,
        elapsed,
    })
}

fn walk_one_root<S: RegistryStore>(
    store: &S,
    hive: Hive,
    matcher: &ValueMatcher,
    matches: &MatchSet,
    metrics: &TraversalMetrics,
) -> SearchResult<()> {
    debug!("Walking {}", hive);
    let root = store.open_root(hive)?;
    TreeWalker::new(matcher, matches, metrics)
        .visit(&root)
        .map_err(|e| SearchError::root_unavailable(hive, e.to_string()))?;
    debug!("Finished {}", hive);
    Ok(())
}
