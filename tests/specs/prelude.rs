// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the CLI specs: an isolated state directory per test
//! and a small assertion wrapper around `tb`.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::{Duration, Instant};

use similar_asserts::assert_eq;
use tempfile::TempDir;

/// Upper bound for any single wait on the daemon.
pub const SPEC_WAIT_MAX_MS: u64 = 10_000;

/// Poll `check` every 50ms until it holds or `max_ms` passes.
pub fn wait_for(max_ms: u64, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// `tb` with no state directory of its own; for help and parse checks.
pub fn cli() -> Cli {
    Cli::new(&std::env::temp_dir().join("tb-specs-unused"))
}

/// A scratch directory holding spec files and a private daemon state dir.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self { dir: TempDir::new().unwrap() }
    }

    /// A project with a running daemon, `acme` registered, and an `analytics`
    /// namespace in it.
    pub fn registered() -> Self {
        let temp = Self::empty();
        temp.tb().args(&["daemon", "start"]).passes();
        temp.tb().args(&["project", "register", "acme"]).passes();
        temp.tb().args(&["namespace", "register", "analytics", "-p", "acme"]).passes();
        temp
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.path().join("state")
    }

    pub fn file(&self, rel: &str, content: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn tb(&self) -> Cli {
        Cli::new(&self.state_path()).current_dir(self.path())
    }

    pub fn daemon_log(&self) -> String {
        std::fs::read_to_string(self.state_path().join("logs/daemon.log")).unwrap_or_default()
    }
}

impl Drop for Project {
    fn drop(&mut self) {
        if self.state_path().join("daemon.sock").exists() {
            let _ = self.tb().args(&["daemon", "stop"]).output();
        }
    }
}

pub struct Cli {
    cmd: assert_cmd::Command,
}

impl Cli {
    fn new(state_dir: &Path) -> Self {
        let mut cmd = assert_cmd::Command::cargo_bin("tb").unwrap();
        cmd.env("TB_STATE_DIR", state_dir)
            .env("TB_DAEMON_BINARY", assert_cmd::cargo::cargo_bin("tbd"))
            .env("NO_COLOR", "1")
            .env_remove("COLOR");
        Self { cmd }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cmd.current_dir(dir);
        self
    }

    pub fn output(mut self) -> Output {
        self.cmd.output().unwrap()
    }

    /// Run and require exit code 0.
    pub fn passes(self) -> Run {
        self.exits(0)
    }

    /// Run and require a specific exit code.
    pub fn exits(self, code: i32) -> Run {
        let run = Run { output: self.output() };
        assert_eq!(
            run.output.status.code(),
            Some(code),
            "stdout:\n{}\nstderr:\n{}",
            run.stdout(),
            run.stderr()
        );
        run
    }
}

pub struct Run {
    output: Output,
}

impl Run {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.output.stdout).unwrap()
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        let stdout = self.stdout();
        assert!(stdout.contains(needle), "stdout lacks {needle:?}:\n{stdout}");
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        let stderr = self.stderr();
        assert!(stderr.contains(needle), "stderr lacks {needle:?}:\n{stderr}");
        self
    }
}

/// A warehouse SQL job on the built-in `sql` plugin writing `acme:mart.<table>`.
pub fn sql_job(name: &str, table: &str, depends_on: &[&str]) -> String {
    let dependencies = depends_on.iter().map(|d| format!("{d:?}")).collect::<Vec<_>>().join(", ");
    format!(
        r#"version = 1
name = "{name}"
owner = "data@acme.io"
dependencies = [{dependencies}]

[schedule]
start_date = "2023-01-01"
interval = "0 0 * * *"

[task]
name = "sql"

[task.config]
PROJECT = "acme"
DATASET = "mart"
TABLE = "{table}"
"#
    )
}
