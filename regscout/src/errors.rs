/// Error types for regscout.
///
/// Registry traversal is full of expected failures: keys guarded by ACLs, keys removed
/// by another process between enumeration and open, names that exceed the API limits,
/// values whose payload does not decode. None of these should stop a search, so the
/// walker captures them per node and only counts them. The variants below exist so the
/// failure can still be logged with a useful reason before it is discarded.
///
/// Errors that *do* reach the caller are few:
/// - a worker thread could not be started (`WorkerSpawn`)
/// - configuration or snapshot files are malformed (`ConfigError`, `JsonError`, `YamlError`)
/// - a finished report could not be written (`IoError` from the persistence layer)
///
/// ```rust,ignore
/// match searcher.run(&store, &history) {
///     Ok(report) => println!("{}", report.rendered()),
///     Err(SearchError::WorkerSpawn(msg)) => eprintln!("cannot start search: {}", msg),
///     Err(e) => eprintln!("{}", e),
/// }
/// ```
use std::io;
use thiserror::Error;

use crate::store::Hive;

/// Result type for search operations
pub type SearchResult<T> = Result<T, SearchError>;

/// Errors that can occur during search operations
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error("Key not found: {0}")]
    KeyNotFound(String),
    #[error("Invalid data in {path}: {reason}")]
    InvalidData { path: String, reason: String },
    #[error("Root unavailable: {hive}: {reason}")]
    RootUnavailable { hive: Hive, reason: String },
    #[error("Failed to start search worker: {0}")]
    WorkerSpawn(String),
    #[error("Search already started")]
    AlreadyStarted,
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl SearchError {
    pub fn access_denied(path: impl Into<String>) -> Self {
        Self::AccessDenied(path.into())
    }

    pub fn key_not_found(path: impl Into<String>) -> Self {
        Self::KeyNotFound(path.into())
    }

    pub fn invalid_data(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidData {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn root_unavailable(hive: Hive, reason: impl Into<String>) -> Self {
        Self::RootUnavailable {
            hive,
            reason: reason.into(),
        }
    }

    pub fn worker_spawn(msg: impl Into<String>) -> Self {
        Self::WorkerSpawn(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Maps an OS error raised while touching `path` onto the access taxonomy.
    pub fn from_io(path: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::key_not_found(path),
            io::ErrorKind::PermissionDenied => Self::access_denied(path),
            io::ErrorKind::InvalidData | io::ErrorKind::InvalidInput => {
                Self::invalid_data(path, err.to_string())
            }
            _ => Self::IoError(err),
        }
    }

    /// Returns true for the ordinary per-key failures of a live registry: denied,
    /// vanished, undecodable or an OS error while reading.
    pub fn is_node_access(&self) -> bool {
        matches!(
            self,
            Self::AccessDenied(_) | Self::KeyNotFound(_) | Self::InvalidData { .. } | Self::IoError(_)
        )
    }
}
