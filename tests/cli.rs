//! Tests that drive the `kbchat` binary. None of them reach AWS: each
//! command exits before its first remote call.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn kbchat_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("kbchat");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_path = config_dir.join("kbchat.toml");
    fs::write(
        &config_path,
        r#"[aws]
region = "eu-central-1"
access_key_id = "AKIATESTKEY"
secret_access_key = "test-secret"
s3_endpoint_url = "http://127.0.0.1:9"
bedrock_agent_endpoint_url = "http://127.0.0.1:9"

[storage]
bucket = "test-bucket"

[agent]
knowledge_base_id = "KB1"
agent_id = "AG1"
"#,
    )
    .unwrap();

    (tmp, config_path)
}

fn run_kbchat(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = kbchat_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .args(args)
        .env_remove("S3_BUCKET")
        .env_remove("KNOWLEDGE_BASE_ID")
        .env_remove("AGENT_ID")
        .env_remove("AWS_REGION")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run kbchat binary at {:?}: {}", binary, e));

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

#[test]
fn test_handle_event_rejects_missing_content() {
    let (tmp, config) = setup_test_env();
    let event_path = tmp.path().join("event.json");
    fs::write(
        &event_path,
        r#"{
  "actionGroup": "file_actions",
  "function": "save_file",
  "parameters": [
    {"name": "file_name", "type": "string", "value": "notes.md"},
    {"name": "content", "type": "string", "value": ""}
  ]
}"#,
    )
    .unwrap();

    let (stdout, stderr, success) =
        run_kbchat(&config, &["handle-event", event_path.to_str().unwrap()]);
    assert!(success, "stderr: {}", stderr);
    let body: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(body["statusCode"], 400);
    assert_eq!(body["body"], "Missing 'content' in request.");
}

#[test]
fn test_handle_event_invalid_json_fails() {
    let (tmp, config) = setup_test_env();
    let event_path = tmp.path().join("event.json");
    fs::write(&event_path, "not json").unwrap();

    let (_, stderr, success) =
        run_kbchat(&config, &["handle-event", event_path.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("Invalid action event"));
}

#[test]
fn test_upload_missing_path_fails() {
    let (_tmp, config) = setup_test_env();
    let (_, stderr, success) = run_kbchat(&config, &["upload", "/no/such/dir/kbchat"]);
    assert!(!success);
    assert!(stderr.contains("Path does not exist"));
}

#[test]
fn test_invalid_config_is_reported() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("bad.toml");
    fs::write(&config_path, "[http]\nconnect_timeout_secs = 0\n").unwrap();

    let (_, stderr, success) = run_kbchat(&config_path, &["sync"]);
    assert!(!success);
    assert!(stderr.contains("http timeouts must be > 0"));
}

#[test]
fn test_missing_resources_warn_but_run() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("empty.toml");
    fs::write(&config_path, "").unwrap();
    let event_path = tmp.path().join("event.json");
    fs::write(&event_path, r#"{"parameters": []}"#).unwrap();

    let output = Command::new(kbchat_binary())
        .arg("--config")
        .arg(&config_path)
        .args(["handle-event", event_path.to_str().unwrap()])
        .env_remove("S3_BUCKET")
        .env_remove("KNOWLEDGE_BASE_ID")
        .env_remove("AGENT_ID")
        .env("AWS_ACCESS_KEY_ID", "AKIATESTKEY")
        .env("AWS_SECRET_ACCESS_KEY", "test-secret")
        .output()
        .unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stderr: {}", stderr);
    assert!(stderr.contains("missing configuration"));
    assert!(stderr.contains("storage.bucket"));
}

#[test]
fn test_load_config_from_file() {
    let (_tmp, config_path) = setup_test_env();
    let cfg = kbchat::config::load_config(&config_path).unwrap();
    assert_eq!(cfg.storage.folder, "upload_files");
    assert_eq!(cfg.agent.alias_id, "TSTALIASID");
    assert_eq!(cfg.credential_method(), "manual");
    assert!(cfg.missing_resources().is_empty());
}

#[test]
fn test_upload_json_progress_on_stderr() {
    let (tmp, config) = setup_test_env();
    let docs = tmp.path().join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(docs.join("notes.md"), "# Notes").unwrap();

    // The configured endpoint refuses connections, so the put fails after
    // progress has been reported.
    let (_, stderr, success) = run_kbchat(
        &config,
        &[
            "upload",
            docs.to_str().unwrap(),
            "--progress",
            "json",
            "--no-sync",
        ],
    );
    assert!(!success);
    let progress: Vec<serde_json::Value> = stderr
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .filter(|v: &serde_json::Value| v["event"] == "progress")
        .collect();
    assert_eq!(progress.len(), 1, "stderr: {}", stderr);
    assert_eq!(progress[0]["name"], "notes.md");
    assert_eq!(progress[0]["n"], 1);
    assert_eq!(progress[0]["total"], 1);
}

#[test]
fn test_upload_rejects_unknown_progress_mode() {
    let (tmp, config) = setup_test_env();
    let (_, stderr, success) = run_kbchat(
        &config,
        &["upload", tmp.path().to_str().unwrap(), "--progress", "loud"],
    );
    assert!(!success);
    assert!(stderr.contains("unknown progress mode"));
}
