//! End-to-end runs of the `locksmith` binary against a temporary store

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn store(&self) -> std::path::PathBuf {
        self.dir.path().join("secrets")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("locksmith").unwrap();
        cmd.current_dir(self.dir.path())
            .env_remove("RUST_LOG")
            .env("LOCKSMITH_STORE__PATH", self.store())
            .env("LOCKSMITH_LOG__LEVEL", "warn");
        cmd
    }

    fn stdout(&self, args: &[&str]) -> String {
        let output = self.cmd().args(args).assert().success().get_output().stdout.clone();
        String::from_utf8(output).unwrap().trim().to_string()
    }

    fn secret_files(&self) -> usize {
        count_secret_files(&self.store())
    }
}

fn count_secret_files(dir: &Path) -> usize {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "secret"))
                .count()
        })
        .unwrap_or(0)
}

#[test]
fn test_status_on_empty_store() {
    let ws = Workspace::new();
    assert_eq!(ws.stdout(&["status"]), "no secrets stored");
}

#[test]
fn test_export_creates_initial_secret() {
    let ws = Workspace::new();
    let hex = ws.stdout(&["export"]);

    assert_eq!(hex.len(), 128);
    assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(ws.secret_files(), 1);

    // Second run loads the same secret instead of creating one
    assert_eq!(ws.stdout(&["export"]), hex);
    assert_eq!(ws.secret_files(), 1);
}

#[test]
fn test_rotate_then_status() {
    let ws = Workspace::new();
    let rotated = ws.stdout(&["rotate"]);
    assert_eq!(ws.secret_files(), 2);

    let status = ws.stdout(&["status"]);
    let id = rotated.split_whitespace().next().unwrap();
    assert!(status.contains(&format!("active:  {id}")));
    assert!(status.contains("stored:  2"));
}

#[test]
fn test_rotate_logs_rotation_event() {
    let ws = Workspace::new();
    ws.cmd()
        .env("LOCKSMITH_LOG__LEVEL", "info")
        .env("LOCKSMITH_LOG__DISPLAY__COLORS", "false")
        .arg("rotate")
        .assert()
        .success()
        .stderr(predicate::str::contains("Signing secret rotated").count(2));
}

#[test]
fn test_sign_then_verify_across_rotation() {
    let ws = Workspace::new();
    let token = ws.stdout(&["sign", "--claims", r#"{"sub":"user-1","role":"admin"}"#]);
    assert_eq!(token.split('.').count(), 3);

    ws.stdout(&["rotate"]);

    let report: serde_json::Value = serde_json::from_str(&ws.stdout(&["verify", &token])).unwrap();
    assert_eq!(report["alg"], "HS256");
    assert_eq!(report["claims"]["sub"], "user-1");
}

#[test]
fn test_verify_rejects_garbage() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["verify", "not.a.token"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("token rejected"));
}

#[test]
fn test_sign_rejects_non_object_claims() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["sign", "--claims", "[1,2]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON object"));
    assert_eq!(ws.secret_files(), 0);
}

#[test]
fn test_run_requires_interval() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("rotation_interval"));
}

#[test]
fn test_local_store_requires_path() {
    let ws = Workspace::new();
    ws.cmd()
        .env_remove("LOCKSMITH_STORE__PATH")
        .arg("export")
        .assert()
        .failure()
        .stderr(predicate::str::contains("store.path"));
}

#[test]
fn test_config_file_and_flag_precedence() {
    let ws = Workspace::new();
    let from_file = ws.dir.path().join("from-file");
    let from_flag = ws.dir.path().join("from-flag");
    fs::write(
        ws.dir.path().join("custom.toml"),
        format!(
            "[store]\npath = {:?}\n\n[jwt]\nalgorithm = \"HS512\"\n",
            from_file.display().to_string()
        ),
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("locksmith").unwrap();
    cmd.current_dir(ws.dir.path())
        .env_remove("LOCKSMITH_STORE__PATH")
        .args(["--config", "custom.toml", "sign", "--claims", "{}"])
        .assert()
        .success();
    assert_eq!(count_secret_files(&from_file), 1);

    let mut cmd = Command::cargo_bin("locksmith").unwrap();
    cmd.current_dir(ws.dir.path())
        .env_remove("LOCKSMITH_STORE__PATH")
        .args(["--config", "custom.toml", "--store-path"])
        .arg(&from_flag)
        .arg("export")
        .assert()
        .success();
    assert_eq!(count_secret_files(&from_flag), 1);
    assert_eq!(count_secret_files(&from_file), 1);
}

#[test]
fn test_missing_explicit_config_fails() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["--config", "absent.toml", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.toml"));
}

#[test]
fn test_memory_store_does_not_persist() {
    let ws = Workspace::new();
    let hex = ws
        .cmd()
        .env("LOCKSMITH_STORE__KIND", "memory")
        .arg("export")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(String::from_utf8(hex).unwrap().trim().len(), 128);
    assert_eq!(ws.secret_files(), 0);
}

#[test]
fn test_invalid_log_format_flag() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["--log-format", "xml", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("xml"));
}
