use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::errors::SearchResult;
use crate::store::Hive;

/// One value that matched the search target.
///
/// Field order is part of the output format: key path, value name, value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Full path of the key holding the value
    #[serde(rename = "Registry Key")]
    pub key_path: String,
    /// Name of the value; the default value is `""`
    #[serde(rename = "Value Name")]
    pub value_name: String,
    /// The value as stored, when it is a string
    #[serde(rename = "Value")]
    pub value: Option<String>,
}

impl MatchRecord {
    pub fn new(
        key_path: impl Into<String>,
        value_name: impl Into<String>,
        value: Option<String>,
    ) -> Self {
        Self {
            key_path: key_path.into(),
            value_name: value_name.into(),
            value,
        }
    }
}

/// Append-only collection of matches shared by every worker of one search.
#[derive(Debug, Default)]
pub struct MatchSet {
    records: Mutex<Vec<MatchRecord>>,
}

impl MatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends all records of one node at once.
    pub fn extend(&self, records: Vec<MatchRecord>) {
        if records.is_empty() {
            return;
        }
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(records);
    }

    /// Consumes the set once every writer has finished.
    pub fn into_inner(self) -> Vec<MatchRecord> {
        self.records
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// What the dispatcher hands to the aggregator after every worker has joined.
#[derive(Debug, Clone, Default)]
pub struct RawSearch {
    /// Unfiltered matches, in completion order
    pub matches: Vec<MatchRecord>,
    /// Keys that could not be opened or read
    pub failed_nodes: u64,
    /// Roots that could not be opened or listed at all
    pub unavailable_roots: Vec<Hive>,
    /// Wall time from before the first worker started until the last one joined
    pub elapsed: Duration,
}

/// The finished, filtered result of one search run.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    pub matches: Vec<MatchRecord>,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
    pub failed_nodes: u64,
    pub unavailable_roots: Vec<Hive>,
    pub summary: String,
    #[serde(skip)]
    rendered: String,
}

impl SearchReport {
    /// Builds the report and its rendered text.
    pub fn new(
        matches: Vec<MatchRecord>,
        elapsed: Duration,
        failed_nodes: u64,
        unavailable_roots: Vec<Hive>,
    ) -> SearchResult<Self> {
        let summary = summary_line(matches.len(), elapsed, failed_nodes, &unavailable_roots);
        let rendered = format!("{}\n{}", serde_json::to_string_pretty(&matches)?, summary);
        Ok(Self {
            matches,
            elapsed,
            failed_nodes,
            unavailable_roots,
            summary,
            rendered,
        })
    }

    /// Number of matches kept after filtering
    pub fn total_matches(&self) -> usize {
        self.matches.len()
    }

    /// Pretty JSON of the matches followed by the summary line
    pub fn rendered(&self) -> &str {
        &self.rendered
    }
}

/// Formats the one-line run summary.
pub fn summary_line(
    matches: usize,
    elapsed: Duration,
    failed_nodes: u64,
    unavailable_roots: &[Hive],
) -> String {
    let mut line = format!(
        "Found {} matches in {:.2} sec. Unprocessed registry keys: '{}'.",
        matches,
        elapsed.as_secs_f64(),
        failed_nodes
    );
    if !unavailable_roots.is_empty() {
        let names: Vec<&str> = unavailable_roots.iter().map(|h| h.name()).collect();
        line.push_str(&format!(" Unavailable roots: {}.", names.join(", ")));
    }
    line
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}
