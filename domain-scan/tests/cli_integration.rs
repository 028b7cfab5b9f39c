// domain-scan/tests/cli_integration.rs

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Command isolated from the user's configuration, with its database in `dir`.
fn cli(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("domain-scan").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir)
        .env("DS_DATABASE", dir.join("state.json"))
        .env_remove("DS_LOG_LEVEL")
        .env_remove("DS_LOG_FILE")
        .env_remove("DS_USE_PROXY")
        .env_remove("RUST_LOG");
    cmd
}

/// Write a state database holding one available and one taken domain.
fn write_state(dir: &Path, running: bool) -> PathBuf {
    let path = dir.join("state.json");
    let json = format!(
        r#"{{
  "scanState": {{
    "running": {},
    "pattern": "a%w.ir",
    "isRegex": false,
    "checks": {{
      "ab.ir": {{ "status": "available", "modifiedAt": 1700000000000 }},
      "ac.ir": {{ "status": "taken", "modifiedAt": 1700000000000 }}
    }}
  }}
}}"#,
        running
    );
    fs::write(&path, json).unwrap();
    path
}

fn read_state(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    cli(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("scan"))
        .stdout(predicate::str::contains("resume"))
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("--config"));
}

#[test]
fn test_validate_prints_expansion_count() {
    let dir = TempDir::new().unwrap();
    cli(dir.path())
        .args(["validate", "--pattern", "ab%d.ir"])
        .assert()
        .success()
        .stdout(predicate::str::contains("expands to 10 domain names"));
}

#[test]
fn test_validate_rejects_huge_patterns() {
    let dir = TempDir::new().unwrap();
    cli(dir.path())
        .args(["validate", "--pattern", "*****.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("more than a million"));
}

#[test]
fn test_validate_names_the_invalid_domain() {
    let dir = TempDir::new().unwrap();
    cli(dir.path())
        .args(["validate", "--pattern", r"a\.ir", "--regex"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid domain names: a.ir"));
}

#[test]
fn test_status_without_database() {
    let dir = TempDir::new().unwrap();
    cli(dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("stopped"))
        .stdout(predicate::str::contains("No available domains yet"));
}

#[test]
fn test_status_json_shows_the_filtered_view() {
    let dir = TempDir::new().unwrap();
    write_state(dir.path(), true);

    let output = cli(dir.path())
        .args(["status", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let view: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(view["running"], true);
    assert_eq!(view["pattern"], "a%w.ir");
    assert_eq!(view["checks"]["ab.ir"]["status"], "available");
    assert!(view["checks"].get("ac.ir").is_none());
}

#[test]
fn test_export_to_stdout() {
    let dir = TempDir::new().unwrap();
    write_state(dir.path(), false);

    cli(dir.path())
        .arg("export")
        .assert()
        .success()
        .stdout("Domain,Last Check\r\nab.ir,2023-11-14T22:13:20.000Z\r\n");
}

#[test]
fn test_export_to_file() {
    let dir = TempDir::new().unwrap();
    write_state(dir.path(), false);
    let out = dir.path().join("available.csv");

    cli(dir.path())
        .args(["export", "--output"])
        .arg(&out)
        .assert()
        .success();

    let csv = fs::read_to_string(&out).unwrap();
    assert!(csv.starts_with("Domain,Last Check\r\n"));
    assert!(csv.contains("ab.ir,"));
    assert!(!csv.contains("ac.ir"));
}

#[test]
fn test_export_with_no_checks_fails() {
    let dir = TempDir::new().unwrap();
    cli(dir.path())
        .arg("export")
        .assert()
        .failure()
        .stderr(predicate::str::contains("There is nothing to export"));
}

#[test]
fn test_stop_marks_scan_stopped() {
    let dir = TempDir::new().unwrap();
    let db = write_state(dir.path(), true);

    cli(dir.path())
        .arg("stop")
        .assert()
        .success()
        .stdout(predicate::str::contains("a%w.ir"));
    assert_eq!(read_state(&db)["scanState"]["running"], false);
    // Checks survive a stop
    assert_eq!(read_state(&db)["scanState"]["checks"]["ac.ir"]["status"], "taken");

    cli(dir.path())
        .arg("stop")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no scan running"));
}

#[test]
fn test_resume_requires_running_scan() {
    let dir = TempDir::new().unwrap();
    write_state(dir.path(), false);

    cli(dir.path())
        .arg("resume")
        .assert()
        .failure()
        .stderr(predicate::str::contains("no scan running"));
}

#[test]
fn test_scan_rejects_unsafe_pattern_before_starting() {
    let dir = TempDir::new().unwrap();
    let db = write_state(dir.path(), false);

    cli(dir.path())
        .args(["scan", "--pattern", "*****.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("more than a million"));
    assert_eq!(read_state(&db)["scanState"]["running"], false);
}

#[test]
fn test_scan_of_fully_checked_pattern_finishes_immediately() {
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("state.json");
    fs::write(
        &db,
        r#"{"scanState":{"running":false,"pattern":"ab.ir","isRegex":false,
            "checks":{"ab.ir":{"status":"available","modifiedAt":1700000000000}}}}"#,
    )
    .unwrap();

    cli(dir.path())
        .args(["scan", "--pattern", "ab.ir"])
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success()
        .stdout(predicate::str::contains("Scan finished"))
        .stdout(predicate::str::contains("1 available, 0 taken"));

    let state = read_state(&db);
    assert_eq!(state["scanState"]["running"], false);
    assert_eq!(state["scanState"]["checks"]["ab.ir"]["status"], "available");
}

#[test]
fn test_scan_while_running_fails() {
    let dir = TempDir::new().unwrap();
    write_state(dir.path(), true);

    cli(dir.path())
        .args(["scan", "--pattern", "b%w.ir"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("stop that first"));
}

#[test]
fn test_missing_explicit_config_fails() {
    let dir = TempDir::new().unwrap();
    cli(dir.path())
        .args(["--config", "nope.toml", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
}

#[test]
fn test_invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "[scan]\ndefault_concurrency = 500\n").unwrap();

    cli(dir.path())
        .arg("--config")
        .arg(&config)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("between 1 and 100"));
}

#[test]
fn test_discovered_config_sets_database_path() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("domain-scan.toml"),
        "[database]\npath = \"custom.json\"\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("custom.json"),
        r#"{"scanState":{"running":true,"pattern":"zz%d.com"}}"#,
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("domain-scan").unwrap();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path())
        .env_remove("DS_DATABASE")
        .env_remove("RUST_LOG")
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("zz%d.com"))
        .stdout(predicate::str::contains("running"));
}
