//! Common test utilities for psort integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't read the
//! user's `~/.config/patch-sorter/` or write logs to their data directory.

#![allow(dead_code)]

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// Header line of every tags file.
pub const TAGS_HEADER: &str = "patch,categories...";

/// A test environment with an isolated working directory.
///
/// Each `TestEnv` creates two temporary directories:
/// - `work_dir`: The directory psort runs in; patches live at the default
///   `paper/patches/server` location inside it
/// - `home_dir`: Holds the system config and logs (via `PSORT_CONFIG_HOME`
///   and `PSORT_DATA_DIR`)
///
/// The `psort()` method sets these per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub work_dir: TempDir,
    pub home_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment without any patches.
    pub fn new() -> Self {
        Self {
            work_dir: TempDir::new().unwrap(),
            home_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a test environment with the given patch files.
    pub fn with_patches(names: &[&str]) -> Self {
        let env = Self::new();
        env.add_patches(names);
        env
    }

    /// Write patch files into the default patches directory.
    pub fn add_patches(&self, names: &[&str]) {
        fs::create_dir_all(self.patches_dir()).unwrap();
        for name in names {
            fs::write(self.patches_dir().join(name), format!("Subject: {}\n", name)).unwrap();
        }
    }

    /// Get a Command for the psort binary running in the working directory.
    pub fn psort(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_psort"));
        cmd.current_dir(self.work_dir.path());
        cmd.env("PSORT_CONFIG_HOME", self.home_dir.path());
        cmd.env("PSORT_DATA_DIR", self.home_dir.path());
        for var in ["PSORT_DIR", "PSORT_LOG", "VISUAL", "EDITOR"] {
            cmd.env_remove(var);
        }
        cmd
    }

    /// Run psort and parse stdout as JSON, asserting success.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.psort().args(args).assert().success().get_output().clone();
        serde_json::from_slice(&output.stdout).unwrap()
    }

    /// Get the path to the working directory.
    pub fn path(&self) -> &Path {
        self.work_dir.path()
    }

    /// Default patches directory.
    pub fn patches_dir(&self) -> PathBuf {
        self.path().join("paper").join("patches").join("server")
    }

    /// Default tags file.
    pub fn tags_path(&self) -> PathBuf {
        self.path().join("paper-categories.csv")
    }

    /// Write the tags file; `lines` follow the header.
    pub fn write_tags(&self, lines: &[&str]) {
        let mut content = format!("{}\n", TAGS_HEADER);
        for line in lines {
            content.push_str(line);
            content.push('\n');
        }
        fs::write(self.tags_path(), content).unwrap();
    }

    /// Read the tags file.
    pub fn read_tags(&self) -> String {
        fs::read_to_string(self.tags_path()).unwrap()
    }

    /// Path of the system config file.
    pub fn system_config_path(&self) -> PathBuf {
        self.home_dir.path().join("config.kdl")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
