// Shared test helpers for integration tests
#![allow(dead_code)]

use assert_cmd::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::{TempDir, tempdir};

/// A scratch directory holding a configuration, a manifest and a fake runner.
pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempdir().expect("Failed to create temporary directory"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// File the fake runner appends `<backend> <test>` to on every invocation.
    pub fn log_path(&self) -> PathBuf {
        self.path().join("invocations.log")
    }

    /// Lines written by the fake runner, in invocation order.
    pub fn invocations(&self) -> Vec<String> {
        fs::read_to_string(self.log_path())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Writes a fake runner script and returns the command line that runs it.
    ///
    /// The script receives `--verbose` as `$1` and the test identifier as `$2`,
    /// logs the backend and test, then decides by name: `*fail*` exits 1,
    /// `*hang*` sleeps past any timeout, anything else passes.
    pub fn write_runner(&self) -> String {
        let script = self.path().join("runner.sh");
        let body = format!(
            r#"echo "$WGPU_BACKEND $2" >> "{log}"
case "$2" in
  *fail*) echo "assertion failed in $2" >&2; exit 1 ;;
  *hang*) exec sleep 30 ;;
esac
echo "ok $2"
"#,
            log = self.log_path().display()
        );
        fs::write(&script, body).expect("Failed to write runner script");
        format!("sh {}", script.display())
    }

    pub fn write_manifest(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, content).expect("Failed to write manifest");
        path
    }

    /// Writes `CtsMatrix.toml` with the given top-level keys and runner command.
    pub fn write_config(&self, top_level: &str, command: &str) -> PathBuf {
        let path = self.path().join("CtsMatrix.toml");
        let content = format!(
            "language = \"en\"\n{top_level}\n\n[runner]\ncommand = \"{command}\"\n"
        );
        fs::write(&path, content).expect("Failed to write configuration");
        path
    }

    /// A `cts-matrix run` command against this fixture's configuration.
    pub fn run_cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("cts-matrix").expect("binary should be built");
        cmd.arg("--lang")
            .arg("en")
            .arg("run")
            .arg("--config")
            .arg(self.path().join("CtsMatrix.toml"));
        cmd
    }
}
