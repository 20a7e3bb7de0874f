//! Shared test infrastructure for integration tests.
//!
//! Each test binary compiles this module and uses a different subset of it.
#![allow(dead_code)]

use serde_json::Value;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Environment variables that would point the binary at a real remote.
const REMOTE_ENV: [&str; 6] = [
    "CLAB_GITHUB_TOKEN",
    "GITHUB_TOKEN",
    "CLAB_GITHUB_REPO",
    "CLAB_GITHUB_PATH",
    "CLAB_GITHUB_BRANCH",
    "CLAB_GITHUB_API",
];

pub const DATASET: &str = r#"{
  "customers.csv": {
    "metadata": {"country": "spain", "isp_used": "Movistar"},
    "columns": {
      "email": {
        "records": ["a@example.com", "b@example.com"],
        "pii_explanation": "contains email addresses",
        "pii_sensitivity_explanation": "contact data is medium sensitive",
        "non_pii_gpt-4o": "addresses identify customers directly"
      },
      "plan": {"records": ["basic", "premium"]}
    },
    "source": "crm export"
  },
  "towers.csv": {
    "metadata": {"country": "italy", "isp_used": "TIM"},
    "columns": {
      "tower_id": {"records": [17, 18], "non_pii_explanation": "internal ids"}
    }
  }
}"#;

pub const GUIDELINES: &str = r#"{
  "Movistar": {
    "low/no sensitivity": ["tariff names"],
    "high sensitivity": ["customer contact details"]
  },
  "TIM": {}
}"#;

/// Temporary working directory holding a dataset and guidelines file.
pub struct Workspace {
    pub dir: TempDir,
}

/// Captured result of one `clab` invocation.
pub struct Run {
    pub output: Output,
}

impl Run {
    pub fn success(&self) -> bool {
        self.output.status.success()
    }

    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.output.stdout).expect("parse stdout as JSON")
    }
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        std::fs::write(dir.path().join("test.json"), DATASET).expect("write dataset");
        std::fs::write(dir.path().join("isps.json"), GUIDELINES).expect("write guidelines");
        Self { dir }
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.dir.path().join("test.json")
    }

    /// Dataset as currently persisted on disk.
    pub fn dataset(&self) -> Value {
        let bytes = std::fs::read(self.dataset_path()).expect("read dataset");
        serde_json::from_slice(&bytes).expect("parse dataset")
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut command = Command::new(env!("CARGO_BIN_EXE_clab"));
        command.args(args).current_dir(self.dir.path());
        for name in REMOTE_ENV {
            command.env_remove(name);
        }
        command.env_remove("RUST_LOG");
        command
    }

    pub fn run(&self, args: &[&str]) -> Run {
        let output = self.command(args).output().expect("run clab");
        Run { output }
    }

    /// Run with `input` piped to stdin.
    pub fn run_with_input(&self, args: &[&str], input: &str) -> Run {
        let mut child = self
            .command(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .expect("spawn clab");
        child
            .stdin
            .take()
            .expect("stdin handle")
            .write_all(input.as_bytes())
            .expect("write stdin");
        let output = child.wait_with_output().expect("wait for clab");
        Run { output }
    }
}

/// Arguments for one complete labeling pass.
pub fn label_args<'a>(file: &'a str, column: &'a str, variant: &'a str) -> Vec<&'a str> {
    vec![
        "label",
        "--file",
        file,
        "--column",
        column,
        "--variant",
        variant,
        "--pii",
        "EMAIL",
        "--pii-level",
        "MEDIUM_SENSITIVE",
        "--non-pii",
        "NON_SENSITIVE",
        "--non-pii-level",
        "NON_SENSITIVE",
    ]
}
