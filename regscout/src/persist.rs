//! Writing finished reports to disk.
//!
//! The engine never writes files itself. Hosts that want a copy of a report call
//! [`save_report`] with the rendered text; the file lands in the user's desktop
//! directory unless another directory is configured.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::info;

use crate::errors::SearchResult;

/// Where reports are saved when no directory is configured: the desktop, then the
/// home directory, then the current directory.
pub fn default_output_dir() -> PathBuf {
    dirs::desktop_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// File name for a report saved at `at`. Colons are replaced so the name is valid on
/// every platform.
pub fn report_file_name(at: SystemTime) -> String {
    let stamp = humantime::format_rfc3339_seconds(at)
        .to_string()
        .replace(':', "-");
    format!("Scan result {}.json", stamp)
}

/// Writes `rendered` to a timestamped file in `dir` and returns its path.
pub fn save_report(rendered: &str, dir: &Path) -> SearchResult<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(report_file_name(SystemTime::now()));
    fs::write(&path, rendered)?;
    info!("Saved scan result to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::tempdir;

    #[test]
    fn test_report_file_name() {
        let at = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(
            report_file_name(at),
            "Scan result 2023-11-14T22-13-20Z.json"
        );
    }

    #[test]
    fn test_save_report() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("reports");
        let path = save_report("[]\nFound 0 matches", &target).unwrap();
        assert!(path.starts_with(&target));
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]\nFound 0 matches");
    }

    #[test]
    fn test_save_report_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        assert!(save_report("report", &blocker).is_err());
    }
}
