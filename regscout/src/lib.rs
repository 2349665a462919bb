pub mod config;
pub mod errors;
pub mod filters;
pub mod history;
pub mod metrics;
pub mod persist;
pub mod results;
pub mod search;
pub mod store;

pub use config::{CliOverrides, SearchConfig};
pub use errors::{SearchError, SearchResult};
pub use filters::Blacklist;
pub use history::SearchHistory;
pub use results::{MatchRecord, SearchReport};
pub use search::{RegistrySearcher, SearchMode};
pub use store::{Hive, MemoryStore, RegistryKey, RegistryStore, RegistryValue};
