#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// A scratch taskdeck root with no remote configured.
pub struct TestDeck {
    dir: TempDir,
}

impl TestDeck {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.dir.path().join("data")
    }

    /// `taskdeck --root <deck>` with the ambient environment scrubbed.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("taskdeck").expect("binary");
        cmd.arg("--root")
            .arg(self.path())
            .env_remove("TASKDECK_ROOT")
            .env_remove("TASKDECK_AUTHOR")
            .env_remove("TASKDECK_REMOTE_URL")
            .env_remove("TASKDECK_REMOTE_KEY")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run with `--json`, expect success and return the envelope.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json envelope")
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    pub fn write_config(&self, contents: &str) -> PathBuf {
        self.write_file(".taskdeck.toml", contents)
    }

    /// Seed a stored document directly, as an older build would have.
    pub fn write_data(&self, key: &str, contents: &str) -> PathBuf {
        self.write_file(&format!("data/{key}.json"), contents)
    }

    pub fn read_data(&self, key: &str) -> Value {
        let raw = fs::read_to_string(self.data_dir().join(format!("{key}.json")))
            .expect("read stored document");
        serde_json::from_str(&raw).expect("stored json")
    }

    pub fn new_project(&self, name: &str) -> String {
        let value = self.json(&["project", "new", name]);
        value["data"]["id"].as_str().expect("project id").to_string()
    }

    pub fn new_task(&self, args: &[&str]) -> String {
        let mut full = vec!["task", "new"];
        full.extend_from_slice(args);
        let value = self.json(&full);
        value["data"]["id"].as_str().expect("task id").to_string()
    }
}
