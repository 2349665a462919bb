/// The concurrent registry search engine.
///
/// A search has three stages:
///
/// 1. **Dispatch** ([`dispatcher`]): the roots are handed to a dedicated rayon pool,
///    either one worker per distinct hive or a single worker walking them in turn.
///    The caller blocks until the whole pool has drained.
/// 2. **Walk** ([`walker`]): each worker descends its hive depth first. Leaves (keys
///    without children) have their values tested by the [`ValueMatcher`]; hits are
///    appended to a shared, mutex-guarded match set. Keys that cannot be opened or read
///    are counted and skipped without disturbing their siblings.
/// 3. **Aggregate** ([`aggregator`]): once every worker has joined, blacklisted paths are
///    dropped and the report with its summary line is built.
///
/// [`RegistrySearcher`] strings the stages together, exposes a `finished` flag for
/// pollers and records each report in a [`SearchHistory`](crate::history::SearchHistory).
///
/// ```rust,ignore
/// let history = SearchHistory::new();
/// let searcher = RegistrySearcher::new("findme", Blacklist::default());
/// let report = searcher.run(&WindowsRegistry::new(), &history)?;
/// println!("{}", report.rendered());
/// ```
pub mod aggregator;
pub mod dispatcher;
pub mod engine;
pub mod matcher;
pub mod walker;

pub use aggregator::finalize;
pub use dispatcher::{dispatch, SearchMode};
pub use engine::RegistrySearcher;
pub use matcher::ValueMatcher;
pub use walker::TreeWalker;
