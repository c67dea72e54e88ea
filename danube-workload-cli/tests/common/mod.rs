#![allow(dead_code)]

use assert_cmd::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

pub fn cli() -> Command {
    let mut cmd = Command::cargo_bin("danube-workload-cli").expect("binary exists");
    cmd.env("RUST_LOG", "warn");
    cmd
}

/// Scratch directory holding the assignment views of a test
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Workspace {
            dir: tempfile::tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, content).expect("write file");
        path
    }
}

pub fn read_json(path: &Path) -> serde_json::Value {
    let content = std::fs::read_to_string(path).expect("read file");
    serde_json::from_str(&content).expect("valid json")
}

/// Runs `balance` and returns its JSON statistics
pub fn balance_json(state: &Path, out: &Path, extra: &[&str]) -> serde_json::Value {
    let output = cli()
        .arg("balance")
        .arg("--state")
        .arg(state)
        .arg("--out")
        .arg(out)
        .args(["--output", "json"])
        .args(extra)
        .output()
        .expect("run balance");
    assert!(
        output.status.success(),
        "balance failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json statistics")
}
