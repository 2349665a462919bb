use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const SNAPSHOT: &str = r#"
HKEY_CURRENT_USER:
  keys:
    Software:
      keys:
        Foo:
          values:
            "": { type: string, data: "findme-secret" }
            Version: { type: string, data: "1.0" }
        Google:
          keys:
            Update:
              values:
                Path: { type: string, data: "C:\\findme\\update.exe" }
HKEY_LOCAL_MACHINE:
  keys:
    Protected:
      fault: access_denied
      keys:
        Secret:
          values:
            findme: { type: string, data: "" }
HKEY_USERS:
  keys: {}
"#;

fn create_snapshot(dir: &TempDir) -> Result<PathBuf> {
    let path = dir.path().join("machine.yaml");
    fs::write(&path, SNAPSHOT)?;
    Ok(path)
}

fn regscout(snapshot: &Path) -> Result<Command> {
    let mut cmd = Command::cargo_bin("regscout-cli")?;
    cmd.env("NO_COLOR", "1").env_remove("RUST_LOG");
    cmd.arg("--config").arg(snapshot.with_file_name("config.yaml"));
    Ok(cmd)
}

fn write_config(dir: &TempDir, content: &str) -> Result<()> {
    fs::write(dir.path().join("config.yaml"), content)?;
    Ok(())
}

#[test]
fn test_search_prints_report() -> Result<()> {
    let dir = tempdir()?;
    let snapshot = create_snapshot(&dir)?;
    write_config(&dir, "log_level: error\n")?;

    regscout(&snapshot)?
        .arg("search")
        .arg("findme")
        .arg("--snapshot")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            r#""Registry Key": "HKEY_CURRENT_USER\\Software\\Foo""#,
        ))
        .stdout(predicate::str::contains(r#""Value": "findme-secret""#))
        .stdout(predicate::str::contains("Google").not())
        .stdout(predicate::str::contains("Found 1 matches in "))
        .stdout(predicate::str::contains("Unprocessed registry keys: '1'."));
    Ok(())
}

#[test]
fn test_search_without_blacklist() -> Result<()> {
    let dir = tempdir()?;
    let snapshot = create_snapshot(&dir)?;
    write_config(&dir, "log_level: error\n")?;

    regscout(&snapshot)?
        .args(["search", "FINDME", "--no-blacklist", "--mode", "single"])
        .arg("--snapshot")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains(r"Google\\Update"))
        .stdout(predicate::str::contains("Found 2 matches in "));
    Ok(())
}

#[test]
fn test_search_stats_only() -> Result<()> {
    let dir = tempdir()?;
    let snapshot = create_snapshot(&dir)?;
    write_config(&dir, "log_level: error\n")?;

    regscout(&snapshot)?
        .args(["search", "findme", "--stats", "--root", "HKCU"])
        .arg("--snapshot")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("Registry Key").not())
        .stdout(predicate::str::contains("Found 1 matches in "))
        .stdout(predicate::str::contains("Unprocessed registry keys: '0'."));
    Ok(())
}

#[test]
fn test_target_from_config_file() -> Result<()> {
    let dir = tempdir()?;
    let snapshot = create_snapshot(&dir)?;
    write_config(
        &dir,
        &format!(
            "target: \"version\"\nlog_level: error\nsnapshot: \"{}\"\n",
            snapshot.display().to_string().replace('\\', "\\\\")
        ),
    )?;

    regscout(&snapshot)?
        .arg("search")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""Value Name": "Version""#));
    Ok(())
}

#[test]
fn test_search_save_report() -> Result<()> {
    let dir = tempdir()?;
    let snapshot = create_snapshot(&dir)?;
    write_config(&dir, "log_level: error\n")?;
    let out_dir = dir.path().join("reports");
    fs::create_dir(&out_dir)?;

    regscout(&snapshot)?
        .args(["search", "findme", "--save"])
        .arg("--snapshot")
        .arg(&snapshot)
        .arg("--output-dir")
        .arg(&out_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Scan result saved to"));

    let saved: Vec<_> = fs::read_dir(&out_dir)?.collect::<Result<_, _>>()?;
    assert_eq!(saved.len(), 1);
    let name = saved[0].file_name().to_string_lossy().into_owned();
    assert!(name.starts_with("Scan result "));
    assert!(name.ends_with(".json"));
    assert!(!name.contains(':'));

    let content = fs::read_to_string(saved[0].path())?;
    assert!(content.contains("findme-secret"));
    assert!(content.trim_end().ends_with("Unprocessed registry keys: '1'."));
    Ok(())
}

#[test]
fn test_save_failure_is_reported() -> Result<()> {
    let dir = tempdir()?;
    let snapshot = create_snapshot(&dir)?;
    write_config(&dir, "log_level: error\n")?;
    // A regular file where the output directory should be
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "")?;

    regscout(&snapshot)?
        .args(["search", "findme", "--save"])
        .arg("--snapshot")
        .arg(&snapshot)
        .arg("--output-dir")
        .arg(blocker.join("nested"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Failed to save scan result"));
    Ok(())
}

#[test]
fn test_missing_target_fails() -> Result<()> {
    let dir = tempdir()?;
    let snapshot = create_snapshot(&dir)?;
    write_config(&dir, "log_level: error\n")?;

    regscout(&snapshot)?
        .arg("search")
        .arg("--snapshot")
        .arg(&snapshot)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No search target given"));
    Ok(())
}

#[test]
fn test_invalid_mode_and_root_rejected() -> Result<()> {
    let dir = tempdir()?;
    let snapshot = create_snapshot(&dir)?;
    write_config(&dir, "log_level: error\n")?;

    regscout(&snapshot)?
        .args(["search", "findme", "--mode", "sideways"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown mode 'sideways'"));

    regscout(&snapshot)?
        .args(["search", "findme", "--root", "HKEY_NOWHERE"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown hive 'HKEY_NOWHERE'"));
    Ok(())
}

#[cfg(not(windows))]
#[test]
fn test_live_registry_requires_windows() -> Result<()> {
    let dir = tempdir()?;
    let snapshot = create_snapshot(&dir)?;
    write_config(&dir, "log_level: error\n")?;

    regscout(&snapshot)?
        .args(["search", "findme"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--snapshot"));
    Ok(())
}

#[test]
fn test_interactive_session() -> Result<()> {
    let dir = tempdir()?;
    let snapshot = create_snapshot(&dir)?;
    write_config(&dir, "log_level: error\n")?;

    // Search, decline saving, start again, view history, search, decline, exit
    let input = "findme\nn\nagain\ny\nnothing-here\nn\n\n";

    regscout(&snapshot)?
        .arg("interactive")
        .arg("--snapshot")
        .arg(&snapshot)
        .write_stdin(input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Enter something to find > "))
        .stdout(predicate::str::contains("Found 1 matches in "))
        .stdout(predicate::str::contains(
            "Press Y to view the history of found matches > ",
        ))
        .stdout(predicate::str::contains("Found 0 matches in "))
        .stdout(predicate::str::contains("Scan result saved to").not());
    Ok(())
}

#[test]
fn test_interactive_ends_at_end_of_input() -> Result<()> {
    let dir = tempdir()?;
    let snapshot = create_snapshot(&dir)?;
    write_config(&dir, "log_level: error\n")?;

    regscout(&snapshot)?
        .arg("interactive")
        .arg("--snapshot")
        .arg(&snapshot)
        .write_stdin("findme\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 1 matches in "));
    Ok(())
}

#[test]
fn test_malformed_config_fails() -> Result<()> {
    let dir = tempdir()?;
    let snapshot = create_snapshot(&dir)?;
    write_config(&dir, "mode: sideways\n")?;

    regscout(&snapshot)?
        .args(["search", "findme"])
        .arg("--snapshot")
        .arg(&snapshot)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"))
        .stderr(predicate::str::contains("Configuration error"));
    Ok(())
}
