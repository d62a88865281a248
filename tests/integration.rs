//! End-to-end tests of the `lens` binary.
//!
//! GitHub is replaced by a local stub and every LLM credential is removed
//! from the child environment, so analysis runs on the offline fallback.

mod common;

use common::{gh_issue, gh_pull, spawn_github_stub};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const CREDENTIAL_VARS: &[&str] = &[
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "GEMINI_API_KEY",
    "OLLAMA_BASE_URL",
    "OLLAMA_MODEL",
    "GITHUB_TOKEN",
];

fn lens_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("lens");
    path
}

fn setup_test_env(github_base: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/lens.sqlite"

[github]
api_base = "{}"
per_page = 50

[llm]
max_attempts = 1
"#,
        root.display(),
        github_base
    );

    let config_path = config_dir.join("lens.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_lens(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let mut cmd = Command::new(lens_binary());
    cmd.arg("--config").arg(config_path).args(args);
    for var in CREDENTIAL_VARS {
        cmd.env_remove(var);
    }

    let output = cmd.output().expect("failed to run lens binary");
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.success(),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn test_init_creates_database() {
    let github = spawn_github_stub().await;
    let (tmp, config) = setup_test_env(&github.base);

    let (stdout, stderr, ok) = run_lens(&config, &["init"]);
    assert!(ok, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized successfully."));
    assert!(tmp.path().join("data/lens.sqlite").exists());

    let (_, stderr, ok) = run_lens(&config, &["init"]);
    assert!(ok, "second init failed: {}", stderr);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scan_then_analyze_offline() {
    let github = spawn_github_stub().await;
    github.set_items(
        "acme/widgets",
        vec![
            gh_issue(11, "Crash when saving", "2024-05-01T00:00:00Z"),
            gh_pull(12, "Fix crash"),
            gh_issue(13, "Add CSV export", "2024-05-02T00:00:00Z"),
        ],
    );
    let (_tmp, config) = setup_test_env(&github.base);

    let (stdout, stderr, ok) = run_lens(&config, &["scan", "acme/widgets"]);
    assert!(ok, "scan failed: {}", stderr);
    assert!(stdout.contains("fetched: 2 open issues"), "{}", stdout);

    let (stdout, stderr, ok) = run_lens(&config, &["analyze", "acme/widgets", "Top themes?"]);
    assert!(ok, "analyze failed: {}", stderr);
    assert!(stdout.contains("MOCK ANALYSIS RESULT"), "{}", stdout);
    assert!(stdout.contains("Prompt Preview for 2 issues"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_analyze_unscanned_repo() {
    let github = spawn_github_stub().await;
    let (_tmp, config) = setup_test_env(&github.base);

    let (stdout, stderr, ok) = run_lens(&config, &["analyze", "acme/widgets", "anything"]);
    assert!(ok, "analyze failed: {}", stderr);
    assert!(stdout.contains("Repo not scanned. Please scan first."));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scan_invalid_repo_fails() {
    let github = spawn_github_stub().await;
    let (_tmp, config) = setup_test_env(&github.base);

    let (_, stderr, ok) = run_lens(&config, &["scan", "widgets"]);
    assert!(!ok);
    assert!(stderr.contains("expected owner/name"), "{}", stderr);
    assert_eq!(github.requests(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_scan_missing_repo_fails() {
    let github = spawn_github_stub().await;
    let (_tmp, config) = setup_test_env(&github.base);

    let (_, stderr, ok) = run_lens(&config, &["scan", "acme/ghost"]);
    assert!(!ok);
    assert!(stderr.contains("404"), "{}", stderr);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_issues_and_repos_listing() {
    let github = spawn_github_stub().await;
    github.set_items(
        "acme/widgets",
        vec![
            gh_issue(21, "Older issue", "2024-01-01T00:00:00Z"),
            gh_issue(22, "Newer issue", "2024-06-01T00:00:00Z"),
        ],
    );
    let (_tmp, config) = setup_test_env(&github.base);

    let (stdout, _, ok) = run_lens(&config, &["repos"]);
    assert!(ok);
    assert!(stdout.contains("No repositories scanned yet."));

    let (_, stderr, ok) = run_lens(&config, &["scan", "acme/widgets"]);
    assert!(ok, "scan failed: {}", stderr);

    let (stdout, _, ok) = run_lens(&config, &["issues", "acme/widgets"]);
    assert!(ok);
    assert!(stdout.contains("2 open issues"));
    let newer = stdout.find("Newer issue").unwrap();
    let older = stdout.find("Older issue").unwrap();
    assert!(newer < older, "expected newest first:\n{}", stdout);

    let (stdout, _, ok) = run_lens(&config, &["repos"]);
    assert!(ok);
    assert!(stdout.contains("acme/widgets"));
}

#[test]
fn test_missing_config_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let mut cmd = Command::new(lens_binary());
    cmd.current_dir(tmp.path())
        .arg("--config")
        .arg(tmp.path().join("absent.toml"))
        .arg("repos");
    for var in CREDENTIAL_VARS {
        cmd.env_remove(var);
    }

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    assert!(tmp.path().join("data/lens.sqlite").exists());
}

#[test]
fn test_invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("lens.toml");
    fs::write(&config_path, "[github]\nper_page = 500\n").unwrap();

    let (_, stderr, ok) = run_lens(&config_path, &["repos"]);
    assert!(!ok);
    assert!(stderr.contains("per_page"), "{}", stderr);
}
