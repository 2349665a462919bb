use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{SearchError, SearchResult};
use crate::filters::Blacklist;
use crate::search::SearchMode;
use crate::store::Hive;

/// Configuration for a registry search.
///
/// # Configuration Locations
///
/// Loaded from the following locations, later ones overriding earlier ones:
/// 1. Global `$CONFIG_DIR/regscout/config.yaml`
/// 2. Local `.regscout.yaml` in the current directory
/// 3. Custom config file specified via `--config`
///
/// Command-line arguments override all of them (see [`SearchConfig::merge_with_cli`]).
///
/// # Configuration Format
///
/// ```yaml
/// # Substring to look for in value names and string values
/// target: "findme"
///
/// # Key paths containing any of these are dropped from the report
/// blacklist:
///   - "windowsselfhost"
///   - "edge"
///   - "google"
///
/// # single: one worker walks every root; multi: one worker per root
/// mode: multi
///
/// # Hives to search
/// roots: ["HKEY_CURRENT_USER", "HKEY_LOCAL_MACHINE", "HKEY_USERS"]
///
/// # Search an exported snapshot instead of the live registry
/// snapshot: "machine.yaml"
///
/// # Directory for saved reports (default: desktop)
/// output_dir: "reports"
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "info"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Substring to search for, matched case-insensitively
    #[serde(default)]
    pub target: String,

    /// Key path substrings excluded from the report
    #[serde(default)]
    pub blacklist: Blacklist,

    /// How roots are spread over workers
    #[serde(default)]
    pub mode: SearchMode,

    /// Hives to walk
    #[serde(default = "default_roots")]
    pub roots: Vec<Hive>,

    /// Optional snapshot file to search instead of the live registry
    #[serde(default)]
    pub snapshot: Option<PathBuf>,

    /// Directory for saved reports
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_roots() -> Vec<Hive> {
    Hive::DEFAULT_ROOTS.to_vec()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            blacklist: Blacklist::default(),
            mode: SearchMode::default(),
            roots: default_roots(),
            snapshot: None,
            output_dir: None,
            log_level: default_log_level(),
        }
    }
}

impl SearchConfig {
    /// Loads configuration from the default locations
    pub fn load() -> SearchResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration, adding a specific file on top of the default locations
    pub fn load_from(config_path: Option<&Path>) -> SearchResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let defaults = [
            dirs::config_dir().map(|p| p.join("regscout/config.yaml")),
            Some(PathBuf::from(".regscout.yaml")),
        ];
        for path in defaults.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        // An explicitly requested file must exist
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder
            .build()
            .and_then(|config| config.try_deserialize())
            .map_err(|e| SearchError::config_error(e.to_string()))
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli_config: CliOverrides) -> Self {
        if let Some(target) = cli_config.target {
            self.target = target;
        }
        if let Some(blacklist) = cli_config.blacklist {
            self.blacklist = blacklist;
        }
        if let Some(mode) = cli_config.mode {
            self.mode = mode;
        }
        if let Some(roots) = cli_config.roots {
            self.roots = roots;
        }
        if cli_config.snapshot.is_some() {
            self.snapshot = cli_config.snapshot;
        }
        if cli_config.output_dir.is_some() {
            self.output_dir = cli_config.output_dir;
        }
        if let Some(level) = cli_config.log_level {
            self.log_level = level;
        }
        self
    }
}

/// Values given on the command line; `None` keeps the configured value
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub target: Option<String>,
    pub blacklist: Option<Blacklist>,
    pub mode: Option<SearchMode>,
    pub roots: Option<Vec<Hive>>,
    pub snapshot: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_load_config_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let config_content = r#"
            target: "FindMe"
            blacklist: ["Vendor", "edge"]
            mode: single
            roots: ["HKEY_CURRENT_USER", "HKEY_USERS"]
            snapshot: "machine.yaml"
            output_dir: "reports"
            log_level: "debug"
        "#;

        let mut file = File::create(&config_path).unwrap();
        file.write_all(config_content.as_bytes()).unwrap();

        let config = SearchConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.target, "FindMe");
        assert_eq!(config.blacklist.entries(), &["vendor", "edge"]);
        assert_eq!(config.mode, SearchMode::Single);
        assert_eq!(config.roots, vec![Hive::CurrentUser, Hive::Users]);
        assert_eq!(config.snapshot, Some(PathBuf::from("machine.yaml")));
        assert_eq!(config.output_dir, Some(PathBuf::from("reports")));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_default_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let mut file = File::create(&config_path).unwrap();
        file.write_all(b"target: \"x\"\n").unwrap();

        let config = SearchConfig::load_from(Some(&config_path)).unwrap();
        assert_eq!(config.target, "x");
        assert_eq!(config.blacklist, Blacklist::default());
        assert_eq!(config.mode, SearchMode::Multi);
        assert_eq!(config.roots, Hive::DEFAULT_ROOTS.to_vec());
        assert_eq!(config.snapshot, None);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_merge_with_cli() {
        let file_config = SearchConfig {
            target: "old".to_string(),
            mode: SearchMode::Single,
            output_dir: Some(PathBuf::from("from-file")),
            ..Default::default()
        };

        let merged = file_config.merge_with_cli(CliOverrides {
            target: Some("new".to_string()),
            blacklist: Some(Blacklist::new(["Contoso"])),
            roots: Some(vec![Hive::LocalMachine]),
            ..Default::default()
        });
        assert_eq!(merged.target, "new"); // CLI value
        assert_eq!(merged.blacklist.entries(), &["contoso"]); // CLI value
        assert_eq!(merged.mode, SearchMode::Single); // File value (CLI None)
        assert_eq!(merged.roots, vec![Hive::LocalMachine]); // CLI value
        assert_eq!(merged.output_dir, Some(PathBuf::from("from-file"))); // File value
    }

    #[test]
    fn test_invalid_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let mut file = File::create(&config_path).unwrap();
        file.write_all(b"mode: sideways\nroots: 12\n").unwrap();

        assert!(matches!(
            SearchConfig::load_from(Some(&config_path)),
            Err(SearchError::ConfigError(_))
        ));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = SearchConfig::load_from(Some(Path::new("nonexistent.yaml")));
        assert!(matches!(result, Err(SearchError::ConfigError(_))));
    }
}
