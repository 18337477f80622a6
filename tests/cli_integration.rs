//! Integration tests for the `tb` CLI.
//!
//! Each test creates a temp data directory, runs `tb` as a subprocess,
//! and verifies stdout and/or the stored JSON.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Get the path to the built `tb` binary.
fn tb_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("tb");
    path
}

/// Run `tb` against `dir`, returning (stdout, stderr, success).
fn run_tb(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let output = Command::new(tb_bin())
        .arg("-C")
        .arg(dir)
        .args(args)
        .env_remove("TASKBOARD_PASSWORD")
        .env_remove("TASKBOARD_LOG")
        .stdin(Stdio::null())
        .output()
        .expect("failed to run tb");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Run `tb` expecting success, return stdout.
fn run_tb_ok(dir: &Path, args: &[&str]) -> String {
    let (stdout, stderr, success) = run_tb(dir, args);
    if !success {
        panic!(
            "tb {:?} failed:\nstdout: {}\nstderr: {}",
            args, stdout, stderr
        );
    }
    stdout
}

fn run_tb_json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let mut full = args.to_vec();
    full.push("--json");
    let out = run_tb_ok(dir, &full);
    serde_json::from_str(&out).unwrap()
}

fn signup_and_login(dir: &Path, email: &str) {
    run_tb_ok(
        dir,
        &[
            "signup",
            "--first-name",
            "Test",
            "--last-name",
            "User",
            "--email",
            email,
            "--password",
            "secret123",
        ],
    );
    run_tb_ok(dir, &["login", "--email", email, "--password", "secret123"]);
}

fn add(dir: &Path, title: &str, due: &str, priority: &str) -> String {
    let v = run_tb_json(dir, &["add", title, "--due", due, "-p", priority]);
    v["id"].as_str().unwrap().to_string()
}

fn listed_titles(dir: &Path, extra: &[&str]) -> Vec<String> {
    let mut args = vec!["list"];
    args.extend_from_slice(extra);
    let v = run_tb_json(dir, &args);
    v["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[test]
fn test_commands_require_login() {
    let tmp = tempfile::TempDir::new().unwrap();
    let (_, stderr, success) = run_tb(tmp.path(), &["list"]);
    assert!(!success);
    assert!(stderr.contains("not logged in"));
}

#[test]
fn test_signup_login_whoami_logout() {
    let tmp = tempfile::TempDir::new().unwrap();
    signup_and_login(tmp.path(), "ada@example.com");

    let out = run_tb_ok(tmp.path(), &["whoami"]);
    assert!(out.contains("Test User <ada@example.com>"));

    run_tb_ok(tmp.path(), &["logout"]);
    let (_, _, success) = run_tb(tmp.path(), &["whoami"]);
    assert!(!success);
    assert!(!tmp.path().join("currentUser.json").exists());
}

#[test]
fn test_login_wrong_password() {
    let tmp = tempfile::TempDir::new().unwrap();
    signup_and_login(tmp.path(), "ada@example.com");
    run_tb_ok(tmp.path(), &["logout"]);
    let (_, stderr, success) = run_tb(
        tmp.path(),
        &["login", "--email", "ada@example.com", "--password", "nope-nope"],
    );
    assert!(!success);
    assert!(stderr.contains("invalid email or password"));
}

#[test]
fn test_login_reads_password_from_stdin() {
    let tmp = tempfile::TempDir::new().unwrap();
    signup_and_login(tmp.path(), "ada@example.com");
    run_tb_ok(tmp.path(), &["logout"]);

    let mut child = Command::new(tb_bin())
        .arg("-C")
        .arg(tmp.path())
        .args(["login", "--email", "ada@example.com"])
        .env_remove("TASKBOARD_PASSWORD")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"secret123\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Logged in as Test User"));
}

#[test]
fn test_profile_update() {
    let tmp = tempfile::TempDir::new().unwrap();
    signup_and_login(tmp.path(), "ada@example.com");
    let out = run_tb_ok(
        tmp.path(),
        &["profile", "--address", "London", "--last-name", "Lovelace"],
    );
    assert!(out.contains("Profile updated"));
    assert!(out.contains("address: London"));

    let users = fs::read_to_string(tmp.path().join("users.json")).unwrap();
    assert!(users.contains("Lovelace"));
    assert!(users.contains("passwordHash"));
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[test]
fn test_add_and_list() {
    let tmp = tempfile::TempDir::new().unwrap();
    signup_and_login(tmp.path(), "ada@example.com");
    add(tmp.path(), "Renew passport", "2099-01-01", "high");

    let out = run_tb_ok(tmp.path(), &["list"]);
    assert!(out.contains("Renew passport"));
    assert!(out.contains("1 total, 0 completed, 1 open, 0 overdue"));

    let todos = fs::read_to_string(tmp.path().join("todos.json")).unwrap();
    assert!(todos.contains("\"dueDate\": \"2099-01-01\""));
}

#[test]
fn test_add_rejects_missing_due_date() {
    let tmp = tempfile::TempDir::new().unwrap();
    signup_and_login(tmp.path(), "ada@example.com");
    let (_, stderr, success) = run_tb(tmp.path(), &["add", "x", "--due", ""]);
    assert!(!success);
    assert!(stderr.contains("due date is required"));
}

#[test]
fn test_list_sort_and_search() {
    let tmp = tempfile::TempDir::new().unwrap();
    signup_and_login(tmp.path(), "ada@example.com");
    add(tmp.path(), "March", "2099-03-01", "low");
    add(tmp.path(), "January", "2099-01-15", "high");
    add(tmp.path(), "February", "2099-02-10", "moderate");

    assert_eq!(
        listed_titles(tmp.path(), &["--sort", "dueDate"]),
        vec!["January", "February", "March"]
    );
    assert_eq!(
        listed_titles(tmp.path(), &["--sort", "priority"]),
        vec!["January", "February", "March"]
    );
    assert_eq!(
        listed_titles(tmp.path(), &["--sort", "title"]),
        vec!["February", "January", "March"]
    );
    assert_eq!(listed_titles(tmp.path(), &["--search", "ARY"]), vec!["January", "February"]);
}

#[test]
fn test_toggle_and_overdue_stats() {
    let tmp = tempfile::TempDir::new().unwrap();
    signup_and_login(tmp.path(), "ada@example.com");
    let id = add(tmp.path(), "Old", "2000-01-01", "low");

    let stats = run_tb_json(tmp.path(), &["stats"]);
    assert_eq!(stats["overdue"], 1);

    let v = run_tb_json(tmp.path(), &["toggle", &id[..8]]);
    assert_eq!(v["completed"], true);
    let stats = run_tb_json(tmp.path(), &["stats"]);
    assert_eq!(stats["overdue"], 0);
    assert_eq!(stats["completed"], 1);
}

#[test]
fn test_edit_keeps_completion() {
    let tmp = tempfile::TempDir::new().unwrap();
    signup_and_login(tmp.path(), "ada@example.com");
    let id = add(tmp.path(), "Draft", "2099-01-01", "low");
    run_tb_ok(tmp.path(), &["toggle", &id]);

    let v = run_tb_json(tmp.path(), &["edit", &id, "--title", "Final", "-p", "high"]);
    assert_eq!(v["title"], "Final");
    assert_eq!(v["priority"], "high");
    assert_eq!(v["completed"], true);
    assert_eq!(v["dueDate"], "2099-01-01");
}

#[test]
fn test_mv_and_rm() {
    let tmp = tempfile::TempDir::new().unwrap();
    signup_and_login(tmp.path(), "ada@example.com");
    let a = add(tmp.path(), "a", "2099-01-01", "low");
    add(tmp.path(), "b", "2099-01-01", "low");
    let c = add(tmp.path(), "c", "2099-01-01", "low");

    run_tb_ok(tmp.path(), &["mv", &c, &a]);
    // Equal due dates keep manual order
    assert_eq!(listed_titles(tmp.path(), &["--sort", "dueDate"]), vec!["c", "a", "b"]);

    run_tb_ok(tmp.path(), &["rm", &a]);
    let out = run_tb_ok(tmp.path(), &["rm", &a]);
    assert!(out.contains("No task"));
    assert_eq!(listed_titles(tmp.path(), &["--sort", "dueDate"]), vec!["c", "b"]);
}

#[test]
fn test_rm_ambiguous_prefix_is_error() {
    let tmp = tempfile::TempDir::new().unwrap();
    signup_and_login(tmp.path(), "ada@example.com");
    let user = run_tb_json(tmp.path(), &["whoami"]);
    let user_id = user["id"].as_str().unwrap();
    let seed = serde_json::json!([
        {"id": "abcd-1", "title": "one", "dueDate": "2099-01-01",
         "createdAt": "2024-01-01T00:00:00Z", "userId": user_id},
        {"id": "abcd-2", "title": "two", "dueDate": "2099-01-01",
         "createdAt": "2024-01-01T00:00:00Z", "userId": user_id},
    ]);
    fs::write(tmp.path().join("todos.json"), seed.to_string()).unwrap();

    let (_, stderr, success) = run_tb(tmp.path(), &["rm", "abcd"]);
    assert!(!success);
    assert!(stderr.contains("ambiguous"));
    assert_eq!(listed_titles(tmp.path(), &["--sort", "dueDate"]), vec!["one", "two"]);

    run_tb_ok(tmp.path(), &["rm", "abcd-2"]);
    assert_eq!(listed_titles(tmp.path(), &[]), vec!["one"]);
}

#[test]
fn test_users_see_only_their_tasks() {
    let tmp = tempfile::TempDir::new().unwrap();
    signup_and_login(tmp.path(), "ada@example.com");
    add(tmp.path(), "ada one", "2099-01-01", "low");
    add(tmp.path(), "ada two", "2099-01-01", "low");
    run_tb_ok(tmp.path(), &["logout"]);

    signup_and_login(tmp.path(), "bob@example.com");
    add(tmp.path(), "bob one", "2099-01-01", "low");
    assert_eq!(listed_titles(tmp.path(), &[]), vec!["bob one"]);
    run_tb_ok(tmp.path(), &["logout"]);

    run_tb_ok(
        tmp.path(),
        &["login", "--email", "ada@example.com", "--password", "secret123"],
    );
    assert_eq!(listed_titles(tmp.path(), &[]), vec!["ada one", "ada two"]);
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[test]
fn test_config_default_sort() {
    let tmp = tempfile::TempDir::new().unwrap();
    signup_and_login(tmp.path(), "ada@example.com");
    add(tmp.path(), "zzz", "2099-01-01", "low");
    add(tmp.path(), "aaa", "2099-02-01", "low");

    run_tb_ok(tmp.path(), &["config", "--sort", "title"]);
    let config = fs::read_to_string(tmp.path().join("config.toml")).unwrap();
    assert!(config.contains("sort = \"title\""));
    assert_eq!(listed_titles(tmp.path(), &[]), vec!["aaa", "zzz"]);
}

#[test]
fn test_corrupt_todos_blob_is_not_clobbered() {
    let tmp = tempfile::TempDir::new().unwrap();
    signup_and_login(tmp.path(), "ada@example.com");
    fs::write(tmp.path().join("todos.json"), "[{oops").unwrap();

    // Listing degrades to empty
    let out = run_tb_ok(tmp.path(), &["list"]);
    assert!(out.contains("No tasks yet"));

    // Writing refuses rather than overwrite the damaged blob
    let (_, stderr, success) = run_tb(tmp.path(), &["add", "x", "--due", "2099-01-01"]);
    assert!(!success);
    assert!(stderr.contains("changes not saved"));
    assert_eq!(
        fs::read_to_string(tmp.path().join("todos.json")).unwrap(),
        "[{oops"
    );
}
