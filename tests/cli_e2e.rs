//! End-to-end CLI tests for the beatmap-fetch binary.

#![allow(deprecated)]

mod support;
use support::socket_guard::{socket_skip_return, start_mock_server_or_skip};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

/// Command with an isolated, empty config home.
fn isolated_command(home: &TempDir) -> Command {
    let config_home = home.path().join("xdg-config");
    std::fs::create_dir_all(&config_home).unwrap();
    let mut cmd = Command::cargo_bin("beatmap-fetch").unwrap();
    cmd.env("XDG_CONFIG_HOME", &config_home).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("beatmap-fetch").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Bulk-download osu! beatmap sets"));
}

#[test]
fn test_binary_version_displays_version() {
    let mut cmd = Command::cargo_bin("beatmap-fetch").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("beatmap-fetch"));
}

#[test]
fn test_binary_without_input_fails() {
    let mut cmd = Command::cargo_bin("beatmap-fetch").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("INPUT"));
}

#[test]
fn test_binary_missing_input_file_fails() {
    let home = TempDir::new().unwrap();
    isolated_command(&home)
        .arg(home.path().join("no-such-file.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read input file"))
        .stderr(predicate::str::contains("failed to read identifier list"));
}

#[test]
fn test_binary_empty_input_succeeds() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("ids.txt");
    std::fs::write(&input, "# nothing yet\n\n").unwrap();

    isolated_command(&home)
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("no beatmap ids found"));
}

#[test]
fn test_binary_invalid_config_file_fails() {
    let home = TempDir::new().unwrap();
    let input = home.path().join("ids.txt");
    std::fs::write(&input, "1").unwrap();
    let config = home.path().join("config.toml");
    std::fs::write(&config, "concurrency = 500\n").unwrap();

    isolated_command(&home)
        .arg("--config")
        .arg(&config)
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("config"));
}

#[tokio::test]
async fn test_binary_downloads_and_reports_failures() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };

    Mock::given(method("GET"))
        .and(path("/d/100"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", r#"attachment; filename="100 A - B.osz""#)
                .set_body_bytes(b"osz".to_vec()),
        )
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/d/200"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&mock_server)
        .await;

    let home = TempDir::new().unwrap();
    let songs = home.path().join("Songs");
    let input = home.path().join("ids.txt");
    let report = home.path().join("report.json");
    std::fs::write(&input, "100\n200 # missing upstream\n").unwrap();

    isolated_command(&home)
        .arg("--url-template")
        .arg(format!("{}/d/{{id}}", mock_server.uri()))
        .args(["--retry-delay", "0", "--max-retries", "2"])
        .arg("--output-dir")
        .arg(&songs)
        .arg("--report")
        .arg(&report)
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Download complete"))
        .stdout(predicate::str::contains("status code: 404"));

    assert_eq!(std::fs::read(songs.join("100 A - B.osz")).unwrap(), b"osz");
    assert!(!songs.join("200.osz").exists());

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["totals"]["completed"], 1);
    assert_eq!(json["totals"]["failed"], 1);
    assert_eq!(json["items"][1]["identifier"], "200");
    assert_eq!(json["items"][1]["outcome"]["status"], "failed");
    assert_eq!(json["items"][1]["outcome"]["attempts"], 2);
}

#[tokio::test]
async fn test_binary_skip_existing_does_not_request_present_sets() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };

    Mock::given(method("GET"))
        .and(path("/d/100"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/d/200"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let home = TempDir::new().unwrap();
    let songs = home.path().join("Songs");
    std::fs::create_dir_all(songs.join("100 Already - Imported")).unwrap();
    let input = home.path().join("ids.txt");
    std::fs::write(&input, "100 200").unwrap();

    isolated_command(&home)
        .arg("--url-template")
        .arg(format!("{}/d/{{id}}", mock_server.uri()))
        .arg("--skip-existing")
        .arg("--output-dir")
        .arg(&songs)
        .arg(&input)
        .assert()
        .success();

    assert!(songs.join("200.osz").exists());
    assert!(!songs.join("100.osz").exists());
}

#[tokio::test]
async fn test_binary_unwritable_report_path_fails_with_context() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return socket_skip_return();
    };

    Mock::given(method("GET"))
        .and(path("/d/100"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"osz".to_vec()))
        .mount(&mock_server)
        .await;

    let home = TempDir::new().unwrap();
    let input = home.path().join("ids.txt");
    std::fs::write(&input, "100").unwrap();
    let report = home.path().join("no-such-dir").join("report.json");

    isolated_command(&home)
        .arg("--url-template")
        .arg(format!("{}/d/{{id}}", mock_server.uri()))
        .arg("--progress")
        .arg("--output-dir")
        .arg(home.path().join("Songs"))
        .arg("--report")
        .arg(&report)
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to write run report"));

    assert!(home.path().join("Songs").join("100.osz").exists());
}
