// drop-scan/tests/cli_integration.rs

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Command isolated from the user's config files and DS_* environment.
fn drop_scan(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("drop-scan").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG");
    for (name, _) in std::env::vars() {
        if name.starts_with("DS_") {
            cmd.env_remove(name);
        }
    }
    cmd
}

async fn mock_upstreams() -> MockServer {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/se.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [
                {"name": "example.se", "release_at": "2026-02-10"},
                {"name": "quiet.se", "release_at": "2026-02-10"},
                {"name": "later.se", "release_at": "2026-02-11"}
            ]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cdx"))
        .and(query_param("url", "*.example.se"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[["urlkey"],["se,example)/"],["se,example)/a"],["se,example)/b"]]"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/cdx"))
        .and(query_param("url", "*.quiet.se"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    server
}

/// Config file pointing the feed and the CDX endpoint at `server`.
fn write_config(dir: &Path, server: &MockServer) -> std::path::PathBuf {
    let config_path = dir.join("scan.toml");
    fs::write(
        &config_path,
        format!(
            r#"
[scan]
tlds = ["se"]

[index]
engines = ["wayback"]
delay = "0ms"
wayback_url = "{uri}/cdx"

[feeds]
se = "{uri}/se.json"
"#,
            uri = server.uri()
        ),
    )
    .unwrap();
    config_path
}

#[test]
fn test_help_shows_flags() {
    let mut cmd = Command::cargo_bin("drop-scan").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--date"))
        .stdout(predicate::str::contains("--no-availability-check"))
        .stdout(predicate::str::contains("--no-index-check"))
        .stdout(predicate::str::contains("--all-domains"))
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--test-fetch"))
        .stdout(predicate::str::contains("--list-reports"))
        .stdout(predicate::str::contains("--output-dir"));
}

#[test]
fn test_invalid_date_fails() {
    let home = TempDir::new().unwrap();
    drop_scan(home.path())
        .args(["--date", "2026-02-30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Invalid date"));
}

#[test]
fn test_conflicting_modes_fail() {
    let home = TempDir::new().unwrap();
    drop_scan(home.path())
        .args(["--test-fetch", "--list-reports"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_oversized_delay_fails_cleanly() {
    let home = TempDir::new().unwrap();
    drop_scan(home.path())
        .args(["--delay", "99999999999999999999999s", "--list-reports"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error: Invalid delay"));

    drop_scan(home.path())
        .env("DS_INDEX_TIMEOUT", "99999999999999999999999s")
        .args(["--list-reports"])
        .assert()
        .success();
}

#[test]
fn test_only_available_without_availability_check_fails() {
    let home = TempDir::new().unwrap();
    drop_scan(home.path())
        .args(["--only-available", "--no-availability-check"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--only-available"));
}

#[test]
fn test_list_reports_empty_directory() {
    let home = TempDir::new().unwrap();
    drop_scan(home.path())
        .args(["--list-reports", "-o", "reports"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No reports"));
}

#[test]
fn test_list_reports_newest_first() {
    let home = TempDir::new().unwrap();
    let reports = home.path().join("reports");
    fs::create_dir_all(&reports).unwrap();
    fs::write(reports.join("2026-02-09.json"), "{}").unwrap();
    fs::write(reports.join("2026-02-10.json"), "{}").unwrap();
    fs::write(reports.join("notes.txt"), "").unwrap();

    let output = drop_scan(home.path())
        .args(["--list-reports", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let dates: Vec<String> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(dates, vec!["2026-02-10", "2026-02-09"]);
}

#[test]
fn test_unreachable_feed_fails_without_reports() {
    let home = TempDir::new().unwrap();
    let reports = home.path().join("out");

    drop_scan(home.path())
        .env("DS_FEED_URL_SE", "http://127.0.0.1:1/se.json")
        .args([
            "--date",
            "2026-02-10",
            "-t",
            "se",
            "--no-availability-check",
            "--no-index-check",
            "-o",
        ])
        .arg(&reports)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));

    assert!(!reports.exists());
}

#[test]
fn test_broken_config_file_fails() {
    let home = TempDir::new().unwrap();
    let config_path = home.path().join("broken.toml");
    fs::write(&config_path, "[index]\nengines = [\"altavista\"]\n").unwrap();

    drop_scan(home.path())
        .arg("--config")
        .arg(&config_path)
        .args(["--list-reports"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config file"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scan_writes_indexed_report() {
    let server = mock_upstreams().await;
    let home = TempDir::new().unwrap();
    let config_path = write_config(home.path(), &server);

    drop_scan(home.path())
        .arg("--config")
        .arg(&config_path)
        .args(["--date", "2026-02-10", "--no-availability-check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("example.se"))
        .stdout(predicate::str::contains("2026-02-10.csv"));

    let csv = fs::read_to_string(home.path().join("reports/2026-02-10.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("example.se,se,2026-02-10,,true,3,wayback,"));
    assert!(home.path().join("reports/2026-02-10.json").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dry_run_json_writes_nothing() {
    let server = mock_upstreams().await;
    let home = TempDir::new().unwrap();
    let config_path = write_config(home.path(), &server);

    let output = drop_scan(home.path())
        .arg("--config")
        .arg(&config_path)
        .args([
            "--date",
            "2026-02-10",
            "--no-availability-check",
            "--all-domains",
            "--dry-run",
            "--json",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let records: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records.len(), 2);
    let quiet = records
        .iter()
        .find(|r| r["domain"] == "quiet.se")
        .unwrap();
    assert_eq!(quiet["indexed"], serde_json::json!(false));
    assert!(quiet["estimated_pages"].is_null());
    assert!(quiet["available"].is_null());

    assert!(!home.path().join("reports").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_test_fetch_lists_drop_list() {
    let server = mock_upstreams().await;
    let home = TempDir::new().unwrap();
    let config_path = write_config(home.path(), &server);

    drop_scan(home.path())
        .arg("--config")
        .arg(&config_path)
        .args(["--date", "2026-02-10", "--test-fetch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 domains listed"))
        .stdout(predicate::str::contains("example.se"))
        .stdout(predicate::str::contains("quiet.se"))
        .stdout(predicate::str::contains("later.se").not());

    drop_scan(home.path())
        .arg("--config")
        .arg(&config_path)
        .args(["--date", "2026-02-10", "--test-fetch", "--lookahead", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("later.se"));

    assert!(!home.path().join("reports").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_future_date_only_available_warns() {
    let server = mock_upstreams().await;
    let home = TempDir::new().unwrap();
    let config_path = write_config(home.path(), &server);

    drop_scan(home.path())
        .arg("--config")
        .arg(&config_path)
        .args(["--date", "2099-02-10", "--only-available", "--dry-run"])
        .assert()
        .success()
        .stderr(predicate::str::contains("is in the future"))
        .stderr(predicate::str::contains("the report will be empty"));
}
