#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// A throwaway data directory driven through the `lb` binary.
pub struct TestBoard {
    dir: TempDir,
}

impl TestBoard {
    /// Fresh board with sounds switched off.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        fs::write(
            dir.path().join("sound-settings.json"),
            r#"{"enabled": false, "volume": 0.5}"#,
        )
        .expect("write sound settings");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn tasks_file(&self) -> PathBuf {
        self.dir.path().join("kanban-tasks.json")
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel_path);
        fs::write(&path, contents).expect("write file");
        path
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("lb").expect("binary");
        cmd.current_dir(self.dir.path())
            .env("LEARNBOARD_DATA_DIR", self.dir.path())
            .env_remove("LEARNBOARD_CONFIG")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run with `--json`, assert success and return the envelope.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json envelope")
    }

    /// Add a task and return its id.
    pub fn add(&self, title: &str, extra: &[&str]) -> String {
        let mut args = vec!["add", title];
        args.extend_from_slice(extra);
        let envelope = self.json(&args);
        envelope["data"]["task"]["id"]
            .as_str()
            .expect("task id")
            .to_string()
    }

    pub fn stored_tasks(&self) -> Vec<Value> {
        let text = fs::read_to_string(self.tasks_file()).expect("tasks file");
        serde_json::from_str(&text).expect("tasks json")
    }
}
