//! Runs the `askrag` binary against a throwaway config.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn askrag_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("askrag");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("files")).unwrap();
    fs::write(root.join("files/data.csv"), "a,b\n1,2\n").unwrap();
    fs::write(root.join("files/notes.txt"), "plain text").unwrap();

    // The llm is never reached by these commands; ollama needs no key.
    let config_content = format!(
        r#"[server]
bind = "127.0.0.1:0"

[intake]
temp_dir = "{root}"

[rate_limit.ingest]
max_requests = 1
window_secs = 3600

[llm]
provider = "ollama"
model = "llama3"

[counter_store]
backend = "sqlite"
path = "{root}/data/counters.sqlite"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("askrag.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_askrag(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = askrag_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run askrag binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_fingerprint_needs_no_config() {
    let (stdout, stderr, success) = run_askrag(
        Path::new("/nonexistent/askrag.toml"),
        &["fingerprint", "user@example.com"],
    );
    assert!(success, "fingerprint failed: {}", stderr);
    assert_eq!(stdout.trim(), "tYmWxQTFY4eY62tRHm9Jrw");
}

#[test]
fn test_completions() {
    let (stdout, _, success) = run_askrag(Path::new("unused.toml"), &["completions", "bash"]);
    assert!(success);
    assert!(stdout.contains("askrag"));
}

#[test]
fn test_missing_config_fails() {
    let (_, stderr, success) = run_askrag(
        Path::new("/nonexistent/askrag.toml"),
        &["ingest", "x.csv", "--user", "a@x.io"],
    );
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"), "{}", stderr);
}

#[test]
fn test_ingest_csv_reports_unsupported() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("files/data.csv");

    let (stdout, stderr, success) = run_askrag(
        &config_path,
        &["ingest", file.to_str().unwrap(), "--user", "a@x.io"],
    );
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);

    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(json["filename"], "data.csv");
    assert_eq!(json["error"], "File type not supported");
}

#[test]
fn test_ingest_unknown_extension_is_rejected() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("files/notes.txt");
    let path = file.to_str().unwrap();

    let (_, stderr, success) = run_askrag(&config_path, &["ingest", path, "--user", "a@x.io"]);
    assert!(!success);
    assert!(stderr.contains("--content-type"), "{}", stderr);

    let (_, stderr, success) = run_askrag(
        &config_path,
        &["ingest", path, "--user", "a@x.io", "--content-type", "text/plain"],
    );
    assert!(!success);
    assert!(stderr.contains("File type not allowed"), "{}", stderr);
}

#[test]
fn test_rate_limit_persists_across_runs() {
    let (tmp, config_path) = setup_test_env();
    let file = tmp.path().join("files/data.csv");
    let args = ["ingest", file.to_str().unwrap(), "--user", "a@x.io"];

    let (_, stderr, success) = run_askrag(&config_path, &args);
    assert!(success, "first ingest failed: {}", stderr);

    let (_, stderr, success) = run_askrag(&config_path, &args);
    assert!(!success);
    assert!(stderr.contains("Rate limit exceeded for ingest"), "{}", stderr);
}
