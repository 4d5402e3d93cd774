//! One-time fetch of the patch source.
//!
//! When the patches directory doesn't exist yet, the upstream repository is
//! cloned into the checkout directory. The clone runs as a child process that
//! callers can poll (the TUI, which keeps drawing while it waits), block on
//! (the CLI), or cancel. Catalog loading must not start before it succeeds.

use crate::config::ResolvedConfig;
use crate::{Error, Result};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// How often a blocking wait checks for cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Whether the patch source still has to be fetched.
pub fn needs_bootstrap(patches_dir: &Path) -> bool {
    !patches_dir.is_dir()
}

/// How a task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Outcome {
    Succeeded,
    Failed(String),
    Cancelled,
}

impl Outcome {
    fn to_result(&self) -> Result<()> {
        match self {
            Outcome::Succeeded => Ok(()),
            Outcome::Failed(message) => Err(Error::Bootstrap(message.clone())),
            Outcome::Cancelled => Err(Error::Bootstrap("Cancelled".to_string())),
        }
    }
}

/// A running fetch of the patch source.
pub struct BootstrapTask {
    child: Child,
    description: String,
    started: Instant,
    outcome: Option<Outcome>,
}

impl BootstrapTask {
    /// Start a shallow clone of `url` into `checkout_dir`.
    ///
    /// Any leftover checkout directory is removed first, since a previous
    /// interrupted clone leaves a partial tree behind. With `quiet` the
    /// child's output is discarded instead of going to stderr.
    pub fn git_clone(url: &str, checkout_dir: &Path, quiet: bool) -> Result<Self> {
        if checkout_dir.exists() {
            tracing::info!(dir = %checkout_dir.display(), "removing stale checkout");
            fs::remove_dir_all(checkout_dir).map_err(|e| {
                Error::Bootstrap(format!(
                    "Could not remove stale checkout {}: {}",
                    checkout_dir.display(),
                    e
                ))
            })?;
        }

        let mut command = Command::new("git");
        command
            .args(["clone", "--depth=1", "--single-branch", url])
            .arg(checkout_dir);
        if quiet {
            command.stdout(Stdio::null()).stderr(Stdio::null());
        } else {
            // Keep stdout free for command output
            command.stdout(Stdio::from(io::stderr()));
        }

        Self::spawn(command, format!("Cloning {}", url))
    }

    /// Start an arbitrary fetch command.
    pub fn spawn(mut command: Command, description: String) -> Result<Self> {
        command.stdin(Stdio::null());
        let child = command.spawn().map_err(|e| {
            Error::Bootstrap(format!(
                "Failed to start {:?}: {}",
                command.get_program(),
                e
            ))
        })?;
        tracing::info!(pid = child.id(), task = %description, "bootstrap started");
        Ok(Self {
            child,
            description,
            started: Instant::now(),
            outcome: None,
        })
    }

    /// Human-readable description of the task.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Time since the task started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Check for completion without blocking.
    ///
    /// Returns `Ok(true)` once the task has succeeded, `Ok(false)` while it
    /// is still running, and an error if it failed or was cancelled. Later
    /// polls repeat the same answer.
    pub fn poll(&mut self) -> Result<bool> {
        if let Some(ref outcome) = self.outcome {
            return outcome.to_result().map(|_| true);
        }
        match self.child.try_wait() {
            Ok(Some(status)) => self.finish(status).map(|_| true),
            Ok(None) => Ok(false),
            Err(e) => Err(Error::Bootstrap(format!("Failed to poll task: {}", e))),
        }
    }

    /// Block until the task finishes.
    ///
    /// The child is killed if `cancel` becomes true while waiting.
    pub fn wait(mut self, cancel: &AtomicBool) -> Result<()> {
        if let Some(ref outcome) = self.outcome {
            return outcome.to_result();
        }
        loop {
            if cancel.load(Ordering::SeqCst) {
                self.cancel()?;
                return Outcome::Cancelled.to_result();
            }
            match self.child.wait_timeout(POLL_INTERVAL) {
                Ok(Some(status)) => return self.finish(status),
                Ok(None) => continue,
                Err(e) => return Err(Error::Bootstrap(format!("Failed to wait for task: {}", e))),
            }
        }
    }

    /// Kill the task. A task that already ended keeps its outcome.
    pub fn cancel(&mut self) -> Result<()> {
        if self.outcome.is_some() {
            return Ok(());
        }
        tracing::warn!(task = %self.description, "cancelling bootstrap");
        // The child may have exited on its own in the meantime
        let _ = self.child.kill();
        let _ = self.child.wait();
        self.outcome = Some(Outcome::Cancelled);
        Ok(())
    }

    fn finish(&mut self, status: ExitStatus) -> Result<()> {
        let outcome = if status.success() {
            tracing::info!(
                task = %self.description,
                elapsed_ms = self.started.elapsed().as_millis() as u64,
                "bootstrap finished"
            );
            Outcome::Succeeded
        } else {
            Outcome::Failed(format!("{} exited with {}", self.description, status))
        };
        let result = outcome.to_result();
        self.outcome = Some(outcome);
        result
    }
}

impl Drop for BootstrapTask {
    fn drop(&mut self) {
        if self.outcome.is_none() {
            let _ = self.cancel();
        }
    }
}

/// Make sure the patches directory exists, cloning if necessary.
///
/// Blocks until the clone is done. Returns `true` if a clone was performed.
pub fn ensure_patches(config: &ResolvedConfig, force: bool, cancel: &AtomicBool) -> Result<bool> {
    if !force && !needs_bootstrap(config.patches_dir()) {
        return Ok(false);
    }

    start_clone(config, false)?.wait(cancel)?;
    verify_patches_dir(config.patches_dir())?;
    Ok(true)
}

/// Check the clone target, then start cloning into it.
pub fn start_clone(config: &ResolvedConfig, quiet: bool) -> Result<BootstrapTask> {
    check_clone_target(config)?;
    BootstrapTask::git_clone(config.repo_url(), config.checkout_dir(), quiet)
}

/// Refuse clones that can't produce the patches directory or whose stale
/// checkout removal would take the working directory or the tags file along.
pub fn check_clone_target(config: &ResolvedConfig) -> Result<()> {
    let checkout_dir = config.checkout_dir();
    if !normalize(config.patches_dir()).starts_with(normalize(checkout_dir)) {
        return Err(Error::Bootstrap(format!(
            "{} is outside the checkout {}, so cloning can't create it",
            config.patches_dir().display(),
            checkout_dir.display()
        )));
    }
    if contains(checkout_dir, config.work_dir()) {
        return Err(Error::Bootstrap(format!(
            "Refusing to clone into {}: it contains the working directory",
            checkout_dir.display()
        )));
    }
    if contains(checkout_dir, config.tags_file()) {
        return Err(Error::Bootstrap(format!(
            "Refusing to clone into {}: it contains the tags file {}",
            checkout_dir.display(),
            config.tags_file().display()
        )));
    }
    Ok(())
}

/// Whether `inner` is `outer` or lies below it.
fn contains(outer: &Path, inner: &Path) -> bool {
    if normalize(inner).starts_with(normalize(outer)) {
        return true;
    }
    // Symlinks only show up once both sides exist
    match (fs::canonicalize(outer), fs::canonicalize(inner)) {
        (Ok(outer), Ok(inner)) => inner.starts_with(outer),
        _ => false,
    }
}

/// Resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Check that a finished bootstrap produced the patches directory.
pub fn verify_patches_dir(patches_dir: &Path) -> Result<PathBuf> {
    if needs_bootstrap(patches_dir) {
        return Err(Error::Bootstrap(format!(
            "Clone finished but {} does not exist",
            patches_dir.display()
        )));
    }
    Ok(patches_dir.to_path_buf())
}
