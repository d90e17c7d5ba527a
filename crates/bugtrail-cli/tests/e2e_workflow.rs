//! E2E CLI workflow tests: users, projects, the bug lifecycle, list
//! ordering and error contracts.
//!
//! Each test runs `bt` as a subprocess in an isolated temp directory.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Test Harness
// ---------------------------------------------------------------------------

/// Build a Command targeting the `bt` binary, rooted in `dir`.
fn bt_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("bt"));
    cmd.current_dir(dir);
    // Keep the user config and identity out of the host environment.
    cmd.env("XDG_CONFIG_HOME", dir.join(".xdg"));
    cmd.env("HOME", dir);
    cmd.env_remove("BUGTRAIL_USER");
    cmd.env_remove("USER");
    cmd.env_remove("FORMAT");
    cmd.env("BUGTRAIL_LOG", "off");
    cmd
}

/// Run `bt --as <actor> <args> --json` and return parsed stdout.
fn bt_json(dir: &Path, actor: &str, args: &[&str]) -> Value {
    let output = bt_cmd(dir)
        .args(["--as", actor])
        .args(args)
        .arg("--json")
        .output()
        .expect("bt should not crash");
    assert!(
        output.status.success(),
        "bt {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("--json should produce valid JSON")
}

/// Run a command expected to fail and return the JSON error object.
fn bt_err(dir: &Path, actor: &str, args: &[&str]) -> Value {
    let output = bt_cmd(dir)
        .args(["--as", actor])
        .args(args)
        .arg("--json")
        .output()
        .expect("bt should not crash");
    assert!(!output.status.success(), "bt {args:?} unexpectedly succeeded");
    // stderr carries the JSON error followed by anyhow's summary line.
    let first = serde_json::Deserializer::from_slice(&output.stderr)
        .into_iter::<Value>()
        .next()
        .expect("stderr should start with a JSON error")
        .expect("valid JSON error");
    first["error"].clone()
}

fn code(err: &Value) -> &str {
    err["error_code"].as_str().expect("error_code")
}

struct Fixture {
    dir: TempDir,
    project: String,
}

impl Fixture {
    fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Tracker with users alice (owner), bob and carol (developers) and
/// dave (registered, not a member), plus one project.
fn setup() -> Fixture {
    let dir = TempDir::new().expect("temp dir");
    bt_cmd(dir.path()).args(["init", "--json"]).assert().success();
    for (id, name) in [
        ("alice", "Alice Owner"),
        ("bob", "Bob Dev"),
        ("carol", "Carol Dev"),
        ("dave", "Dave Outsider"),
    ] {
        bt_cmd(dir.path())
            .args(["user", "add", id, "--name", name])
            .assert()
            .success();
    }
    let project = bt_json(
        dir.path(),
        "alice",
        &["project", "create", "Payments", "--dev", "bob", "--dev", "carol"],
    );
    let project = project["id"].as_str().expect("project id").to_string();
    Fixture { dir, project }
}

fn file_bug(fx: &Fixture, reporter: &str, title: &str, extra: &[&str]) -> Value {
    let mut args = vec!["bug", "create", fx.project.as_str(), "--title", title];
    args.extend_from_slice(extra);
    bt_json(fx.path(), reporter, &args)
}

fn listed_ids(list: &Value) -> Vec<String> {
    list["bugs"]
        .as_array()
        .expect("bugs array")
        .iter()
        .map(|b| b["id"].as_str().expect("id").to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Setup and identity
// ---------------------------------------------------------------------------

#[test]
fn commands_outside_tracker_report_not_initialized() {
    let dir = TempDir::new().unwrap();
    let err = bt_err(dir.path(), "alice", &["user", "list"]);
    assert_eq!(code(&err), "E1001");
}

#[test]
fn mutations_require_an_acting_user() {
    let fx = setup();
    let output = bt_cmd(fx.path())
        .args(["project", "create", "Orphan", "--json"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let err: Value = serde_json::Deserializer::from_slice(&output.stderr)
        .into_iter::<Value>()
        .next()
        .unwrap()
        .unwrap();
    assert_eq!(err["error"]["error_code"], "missing_user");
}

#[test]
fn acting_user_from_env() {
    let fx = setup();
    bt_cmd(fx.path())
        .env("BUGTRAIL_USER", "bob")
        .args(["sidebar"])
        .assert()
        .success()
        .stdout(predicate::str::contains("developing"));
}

#[test]
fn duplicate_user_is_rejected() {
    let fx = setup();
    let err = bt_err(fx.path(), "alice", &["user", "add", "bob", "--name", "Again"]);
    assert_eq!(code(&err), "E2003");
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn new_bug_starts_unassigned_or_todo() {
    let fx = setup();
    let open = file_bug(&fx, "bob", "Refund rounding", &[]);
    assert_eq!(open["status"], "UNASSIGNED");
    assert!(open["assignee_id"].is_null());

    let assigned = file_bug(&fx, "bob", "Card declined", &["--assignee", "carol"]);
    assert_eq!(assigned["status"], "TODO");
    assert_eq!(assigned["assignee_id"], "carol");
}

#[test]
fn assign_work_then_owner_closes() {
    let fx = setup();
    let bug = file_bug(&fx, "bob", "Refund rounding", &["--priority", "high"]);
    let id = bug["id"].as_str().unwrap();

    let assigned = bt_json(fx.path(), "alice", &["assign", id, "bob"]);
    assert_eq!(assigned["status"], "TODO");
    assert_eq!(assigned["assignee_id"], "bob");

    let working = bt_json(fx.path(), "bob", &["status", id, "in-progress"]);
    assert_eq!(working["status"], "INPROGRESS");

    let err = bt_err(fx.path(), "bob", &["status", id, "closed"]);
    assert_eq!(code(&err), "E2001");
    let shown = bt_json(fx.path(), "bob", &["bug", "show", id]);
    assert_eq!(shown["status"], "INPROGRESS");

    let closed = bt_json(fx.path(), "alice", &["status", id, "closed"]);
    assert_eq!(closed["status"], "CLOSED");
    assert_eq!(closed["assignee_id"], "bob");
}

#[test]
fn only_assignee_or_owner_changes_status() {
    let fx = setup();
    let bug = file_bug(&fx, "bob", "Flaky export", &["--assignee", "bob"]);
    let id = bug["id"].as_str().unwrap();

    let err = bt_err(fx.path(), "carol", &["status", id, "testing"]);
    assert_eq!(code(&err), "E2001");
    assert_eq!(err["retryable"], Value::Null);
}

#[test]
fn priority_is_for_reporter_or_owner() {
    let fx = setup();
    let bug = file_bug(&fx, "carol", "Slow search", &[]);
    let id = bug["id"].as_str().unwrap();

    assert_eq!(
        bt_json(fx.path(), "carol", &["priority", id, "critical"])["priority"],
        "CRITICAL"
    );
    assert_eq!(
        bt_json(fx.path(), "alice", &["priority", id, "low"])["priority"],
        "LOW"
    );
    let err = bt_err(fx.path(), "bob", &["priority", id, "high"]);
    assert_eq!(code(&err), "E2001");
}

#[test]
fn outsiders_cannot_be_assigned() {
    let fx = setup();
    let bug = file_bug(&fx, "bob", "Timeout", &[]);
    let id = bug["id"].as_str().unwrap();

    let err = bt_err(fx.path(), "alice", &["assign", id, "dave"]);
    assert_eq!(code(&err), "E2002");
    let shown = bt_json(fx.path(), "alice", &["bug", "show", id]);
    assert_eq!(shown["status"], "UNASSIGNED");
}

#[test]
fn unassign_returns_to_unassigned() {
    let fx = setup();
    let bug = file_bug(&fx, "bob", "Timeout", &["--assignee", "carol"]);
    let id = bug["id"].as_str().unwrap();
    bt_json(fx.path(), "carol", &["status", id, "testing"]);

    let cleared = bt_json(fx.path(), "carol", &["unassign", id]);
    assert_eq!(cleared["status"], "UNASSIGNED");
    assert!(cleared["assignee_id"].is_null());

    // Reassigning an unassigned bug starts it over at TODO.
    let again = bt_json(fx.path(), "carol", &["assign", id, "bob"]);
    assert_eq!(again["status"], "TODO");
}

#[test]
fn comments_are_trimmed_and_blank_ones_rejected() {
    let fx = setup();
    let bug = file_bug(&fx, "bob", "Typo on invoice", &[]);
    let id = bug["id"].as_str().unwrap();

    let err = bt_err(fx.path(), "dave", &["comment", id, "   "]);
    assert_eq!(code(&err), "E2003");

    let comment = bt_json(fx.path(), "dave", &["comment", id, "  seen it too  "]);
    assert_eq!(comment["body"], "seen it too");
    assert_eq!(comment["author_id"], "dave");

    let shown = bt_json(fx.path(), "bob", &["bug", "show", id]);
    assert_eq!(shown["comments"].as_array().unwrap().len(), 1);
}

#[test]
fn unregistered_comment_author_is_not_found() {
    let fx = setup();
    let bug = file_bug(&fx, "bob", "Typo on invoice", &[]);
    let id = bug["id"].as_str().unwrap();

    let err = bt_err(fx.path(), "ghost", &["comment", id, "hello"]);
    assert_eq!(code(&err), "E3001");
    assert!(err.get("retryable").is_none());

    let shown = bt_json(fx.path(), "bob", &["bug", "show", id]);
    assert!(shown["comments"].as_array().unwrap().is_empty());
}

#[test]
fn bug_show_lists_capabilities_for_actor() {
    let fx = setup();
    let bug = file_bug(&fx, "bob", "Crash on login", &["--assignee", "bob"]);
    let id = bug["id"].as_str().unwrap();

    let shown = bt_json(fx.path(), "bob", &["bug", "show", id]);
    let allowed: Vec<&str> = shown["allowed_statuses"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap())
        .collect();
    assert!(allowed.contains(&"TESTING"));
    assert!(!allowed.contains(&"CLOSED"));
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[test]
fn list_hides_closed_until_asked() {
    let fx = setup();
    let keep = file_bug(&fx, "bob", "Still open", &["--assignee", "bob"]);
    let done = file_bug(&fx, "bob", "Already fixed", &["--assignee", "bob"]);
    let done_id = done["id"].as_str().unwrap();
    bt_json(fx.path(), "alice", &["status", done_id, "closed"]);

    let default = bt_json(fx.path(), "alice", &["bug", "list", &fx.project]);
    assert_eq!(listed_ids(&default), [keep["id"].as_str().unwrap()]);

    let all = bt_json(fx.path(), "alice", &["bug", "list", &fx.project, "--all"]);
    assert_eq!(listed_ids(&all).len(), 2);

    let closed_only = bt_json(
        fx.path(),
        "alice",
        &["bug", "list", &fx.project, "--status", "closed"],
    );
    assert_eq!(listed_ids(&closed_only), [done_id]);
}

#[test]
fn list_sorts_by_requested_criterion() {
    let fx = setup();
    let quiet = file_bug(&fx, "bob", "Quiet one", &["--priority", "low"]);
    let busy = file_bug(&fx, "bob", "Busy one", &["--priority", "critical"]);
    let middle = file_bug(&fx, "bob", "Middle one", &["--priority", "medium"]);
    let (quiet, busy, middle) = (
        quiet["id"].as_str().unwrap(),
        busy["id"].as_str().unwrap(),
        middle["id"].as_str().unwrap(),
    );
    for body in ["one", "two", "three"] {
        bt_json(fx.path(), "carol", &["comment", busy, body]);
    }
    bt_json(fx.path(), "carol", &["comment", middle, "just one"]);

    let by_comments = bt_json(
        fx.path(),
        "alice",
        &["bug", "list", &fx.project, "--sort", "most-comments"],
    );
    assert_eq!(listed_ids(&by_comments), [busy, middle, quiet]);
    assert_eq!(by_comments["sort"], "most-comments");

    let by_priority = bt_json(
        fx.path(),
        "alice",
        &["bug", "list", &fx.project, "--sort", "lowest-priority"],
    );
    assert_eq!(listed_ids(&by_priority), [quiet, middle, busy]);

    let oldest = bt_json(
        fx.path(),
        "alice",
        &["bug", "list", &fx.project, "--sort", "oldest"],
    );
    assert_eq!(listed_ids(&oldest), [quiet, busy, middle]);
}

#[test]
fn mine_and_sidebar_show_assigned_work() {
    let fx = setup();
    let bug = file_bug(&fx, "alice", "Ledger drift", &["--assignee", "carol"]);
    let id = bug["id"].as_str().unwrap();

    let mine = bt_json(fx.path(), "carol", &["bug", "mine"]);
    assert_eq!(listed_ids(&mine), [id]);

    let sidebar = bt_json(fx.path(), "carol", &["sidebar"]);
    assert_eq!(sidebar["developing"].as_array().unwrap().len(), 1);
    assert!(sidebar["owned"].as_array().unwrap().is_empty());
    assert_eq!(sidebar["open_assigned"][0]["id"], id);
}

#[test]
fn pretty_list_uses_status_labels() {
    let fx = setup();
    file_bug(&fx, "bob", "Shown in table", &["--assignee", "bob"]);
    bt_cmd(fx.path())
        .args(["--as", "bob", "bug", "mine"])
        .env("FORMAT", "pretty")
        .assert()
        .success()
        .stdout(predicate::str::contains("Assigned to bob"))
        .stdout(predicate::str::contains("Shown in table"));
}

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

#[test]
fn roster_changes_are_owner_only() {
    let fx = setup();
    let err = bt_err(fx.path(), "bob", &["project", "add-dev", &fx.project, "dave"]);
    assert_eq!(code(&err), "E2001");

    let project = bt_json(fx.path(), "alice", &["project", "add-dev", &fx.project, "dave"]);
    assert!(
        project["developer_ids"]
            .as_array()
            .unwrap()
            .iter()
            .any(|d| d == "dave")
    );
}

#[test]
fn owner_is_never_listed_as_developer() {
    let fx = setup();
    bt_json(fx.path(), "alice", &["project", "add-dev", &fx.project, "alice"]);
    let devs = bt_json(fx.path(), "alice", &["project", "developers", &fx.project]);
    let ids: Vec<&str> = devs
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["bob", "carol"]);
}

#[test]
fn delete_requires_owner_and_exact_name() {
    let fx = setup();
    let bug = file_bug(&fx, "bob", "Goes away", &[]);
    let bug_id = bug["id"].as_str().unwrap();

    let err = bt_err(
        fx.path(),
        "bob",
        &["project", "delete", &fx.project, "--confirm", "Payments"],
    );
    assert_eq!(code(&err), "E2001");

    let err = bt_err(
        fx.path(),
        "alice",
        &["project", "delete", &fx.project, "--confirm", "payments"],
    );
    assert_eq!(code(&err), "E2003");

    let deleted = bt_json(
        fx.path(),
        "alice",
        &["project", "delete", &fx.project, "--confirm", "Payments"],
    );
    assert_eq!(deleted["ok"], true);

    let err = bt_err(fx.path(), "alice", &["bug", "show", bug_id]);
    assert_eq!(code(&err), "E3003");
    let err = bt_err(fx.path(), "alice", &["project", "show", &fx.project]);
    assert_eq!(code(&err), "E3002");
}

#[test]
fn malformed_ids_fail_before_the_database() {
    let dir = TempDir::new().unwrap();
    let err = bt_err(dir.path(), "alice", &["bug", "show", "not-a-bug"]);
    assert_eq!(code(&err), "invalid_id");
}

#[test]
fn malformed_config_is_a_coded_error() {
    let fx = setup();
    std::fs::write(fx.path().join(".bugtrail/config.toml"), "[storage\nwrite_timeout_ms = ")
        .unwrap();

    let err = bt_err(fx.path(), "alice", &["project", "list"]);
    assert_eq!(code(&err), "E1002");
    assert!(err["message"].as_str().unwrap().contains("config.toml"));

    bt_cmd(fx.path())
        .args(["--as", "alice", "project", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: Failed to parse"));
}
