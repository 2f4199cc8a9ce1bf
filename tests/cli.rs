//! CLI integration tests.
//!
//! Each test gets its own temp project dir and home dir; child processes
//! use `.current_dir()` so tests run in parallel safely.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

struct Cli {
    dir: TempDir,
    home: TempDir,
}

impl Cli {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
            home: TempDir::new().expect("temp home"),
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("keyturn").expect("binary");
        cmd.current_dir(self.dir.path())
            .env("HOME", self.home.path())
            .env("NO_COLOR", "1");
        cmd
    }

    fn init(&self) {
        self.cmd().arg("init").assert().success();
    }
}

// --- Init ---

#[test]
fn test_init_writes_config() {
    let t = Cli::new();
    t.cmd()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("initialized"));

    let config = std::fs::read_to_string(t.dir.path().join(".keyturn.toml")).unwrap();
    assert!(config.contains("api-key"));
    assert!(config.contains("store_dir"));
}

#[test]
fn test_init_twice_fails() {
    let t = Cli::new();
    t.init();
    t.cmd()
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn test_init_scram_adapter() {
    let t = Cli::new();
    t.cmd()
        .args(["init", "--adapter", "scram"])
        .assert()
        .success();
    let config = std::fs::read_to_string(t.dir.path().join(".keyturn.toml")).unwrap();
    assert!(config.contains("scram"));
    assert!(config.contains("principal"));
}

#[test]
fn test_init_unknown_adapter_fails() {
    let t = Cli::new();
    t.cmd()
        .args(["init", "--adapter", "ldap"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown adapter"));
}

// --- Trigger contract ---

#[test]
fn test_run_without_init_fails_with_hint() {
    let t = Cli::new();
    t.cmd()
        .args(["run", "db-prod", "createSecret", "--token", "t1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn test_run_unknown_phase_fails() {
    let t = Cli::new();
    t.init();
    t.cmd()
        .args(["run", "db-prod", "deleteSecret", "--token", "t1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown phase"));
}

#[test]
fn test_run_phases_in_order() {
    let t = Cli::new();
    t.init();

    for phase in ["createSecret", "setSecret", "testSecret", "finishSecret"] {
        t.cmd()
            .args(["run", "db-prod", phase, "--token", "t1"])
            .assert()
            .success()
            .stdout(predicate::str::contains(phase));
    }

    t.cmd()
        .args(["status", "db-prod"])
        .assert()
        .success()
        .stdout(predicate::str::contains("current"));
}

#[test]
fn test_run_out_of_order_fails() {
    let t = Cli::new();
    t.init();
    t.cmd()
        .args(["run", "db-prod", "testSecret", "--token", "t1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of order"));
}

#[test]
fn test_run_is_idempotent() {
    let t = Cli::new();
    t.init();
    t.cmd()
        .args(["run", "db-prod", "createSecret", "--token", "t1"])
        .assert()
        .success();
    // Same call again is a safe retry.
    t.cmd()
        .args(["run", "db-prod", "createSecret", "--token", "t1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already staged"));
}

// --- Full rotation ---

#[test]
fn test_rotate_end_to_end() {
    let t = Cli::new();
    t.init();
    t.cmd()
        .args(["rotate", "db-prod"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rotation complete"));

    t.cmd()
        .args(["status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("db-prod"));
}

#[test]
fn test_second_rotation_creates_previous() {
    let t = Cli::new();
    t.init();
    t.cmd().args(["rotate", "db-prod"]).assert().success();
    t.cmd().args(["rotate", "db-prod"]).assert().success();

    t.cmd()
        .args(["status", "db-prod"])
        .assert()
        .success()
        .stdout(predicate::str::contains("previous"));
}

#[test]
fn test_retire_within_default_grace_is_noop() {
    let t = Cli::new();
    t.init();
    t.cmd().args(["rotate", "db-prod"]).assert().success();
    t.cmd().args(["rotate", "db-prod"]).assert().success();

    // Default grace period is a day; nothing retires immediately.
    t.cmd()
        .args(["retire", "db-prod"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nothing to retire"));
}

#[test]
fn test_status_empty_store() {
    let t = Cli::new();
    t.init();
    t.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("no secrets"));
}

#[test]
fn test_completions_bash() {
    let t = Cli::new();
    t.cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("keyturn"));
}
