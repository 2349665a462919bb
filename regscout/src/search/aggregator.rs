use tracing::debug;

use crate::errors::SearchResult;
use crate::filters::Blacklist;
use crate::results::{RawSearch, SearchReport};

/// Turns the joined traversal output into the final report.
///
/// Must only be called once every worker has finished; `RawSearch` is produced by
/// the dispatcher after the join, which enforces that ordering.
pub fn finalize(raw: RawSearch, blacklist: &Blacklist) -> SearchResult<SearchReport> {
    let before = raw.matches.len();
    let matches = blacklist.retain_allowed(raw.matches);
    debug!(
        "Blacklist removed {} of {} matches",
        before - matches.len(),
        before
    );
    SearchReport::new(
        matches,
        raw.elapsed,
        raw.failed_nodes,
        raw.unavailable_roots,
    )
}
