//! The `fanout` binary: result document on stdout, exit status per outcome.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;

use serde_json::Value;
use tokio::process::Command;
use wiremock::MockServer;

use crate::common::{ok, received, sleep_url, start_sleep_mock};

async fn run_fanout(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fanout"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("FANOUT_UPSTREAM_URL")
        .env("RUST_LOG", "warn")
        .output()
        .await
        .unwrap()
}

fn document(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, body).unwrap();
    path
}

async fn run_with_upstream(server: &MockServer, args: &[&str]) -> Output {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, "");
    let url = sleep_url(server);
    let mut full = args.to_vec();
    full.extend(["--upstream", url.as_str()]);
    run_fanout(&config, &full).await
}

#[tokio::test]
async fn prints_times_and_exits_zero() {
    let server = start_sleep_mock(&[ok(50)]).await;

    let output = run_with_upstream(&server, &["first", "--timeout", "1000"]).await;

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(document(&output), serde_json::json!({ "times": [50] }));
}

#[tokio::test]
async fn invalid_timeout_exits_two_without_calling_upstream() {
    let server = start_sleep_mock(&[ok(50)]).await;

    let output = run_with_upstream(&server, &["all", "--timeout", "50"]).await;

    assert_eq!(output.status.code(), Some(2));
    assert_eq!(document(&output)["error"], "invalid_timeout");
    assert_eq!(received(&server).await, 0);
}

#[tokio::test]
async fn deadline_exceeded_exits_one() {
    let server = start_sleep_mock(&[ok(2000)]).await;

    let output = run_with_upstream(&server, &["all", "--timeout", "200"]).await;

    assert_eq!(output.status.code(), Some(1));
    let doc = document(&output);
    assert_eq!(doc["error"], "deadline_exceeded");
    assert!(doc["message"].as_str().unwrap().contains("200ms"));
}

#[tokio::test]
async fn config_supplies_upstream_policy_and_timeout() {
    let server = start_sleep_mock(&[ok(50), ok(2000)]).await;
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(
        &dir,
        &format!(
            "[upstream]\nurl = \"{}\"\n\n[request]\npolicy = \"collect\"\ntimeout_ms = 300\n",
            sleep_url(&server)
        ),
    );

    let output = run_fanout(&config, &[]).await;

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(document(&output), serde_json::json!({ "times": [50] }));
    assert_eq!(received(&server).await, 3);
}

#[tokio::test]
async fn broken_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_config(&dir, "[request\n");

    let output = run_fanout(&config, &["first"]).await;

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
}
