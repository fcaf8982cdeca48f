//! CLI integration tests
//!
//! Runs the `notemind` binary and checks argument handling and the local
//! checks that happen before any request is made.

use assert_cmd::Command;
use predicates::prelude::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;

#[test]
fn test_help_lists_commands() {
    let mut cmd = Command::cargo_bin("notemind").unwrap();
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("subjects"))
        .stdout(predicate::str::contains("upload"))
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("chat"));
}

#[test]
fn test_version_with_custom_config() {
    let (_dir, config_path) = common::temp_config_file(
        r#"
api:
  base_url: "http://localhost:5000"
  timeout_seconds: 30
notifications:
  default_ttl_ms: 1500
"#,
    );

    let mut cmd = Command::cargo_bin("notemind").unwrap();
    cmd.arg("--config").arg(config_path).arg("--version");

    cmd.assert().success();
}

#[test]
fn test_upload_missing_file_fails_before_sending() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.pdf");

    let mut cmd = Command::cargo_bin("notemind").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("none.yaml"))
        .arg("--api-base")
        .arg("http://127.0.0.1:1")
        .arg("upload")
        .arg("--subject")
        .arg("Physics")
        .arg(&missing);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_invalid_api_base_is_rejected() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("notemind").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("none.yaml"))
        .arg("--api-base")
        .arg("ftp://example.com")
        .arg("subjects");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("http or https"));
}

#[test]
fn test_upload_requires_subject_flag() {
    let mut cmd = Command::cargo_bin("notemind").unwrap();
    cmd.arg("upload").arg("notes.pdf");

    cmd.assert().failure();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_subjects_command_prints_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subjects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "success",
            "subjects": ["Physics", "Biology"]
        })))
        .mount(&server)
        .await;
    let dir = tempfile::tempdir().unwrap();
    let uri = server.uri();

    // The mock server needs this runtime while the binary runs.
    let output = tokio::task::spawn_blocking(move || {
        Command::cargo_bin("notemind")
            .unwrap()
            .arg("--config")
            .arg(dir.path().join("none.yaml"))
            .arg("--api-base")
            .arg(uri)
            .arg("subjects")
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(predicate::str::contains("Biology").eval(&stdout));
    assert!(predicate::str::contains("Physics").eval(&stdout));
}
