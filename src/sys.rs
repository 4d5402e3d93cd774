//! System utilities for handing files to the host environment

use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use wait_timeout::ChildExt;

/// How long a platform opener gets to report failure before it's left to run
const OPENER_GRACE: Duration = Duration::from_secs(1);

/// The program used to open a file, and where it was chosen from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opener {
    /// Command line, split on whitespace (e.g. `code --wait`)
    pub command: Vec<String>,
    /// Whether the opener takes over the terminal until it exits
    pub interactive: bool,
}

/// Pick the command used to open patch files.
///
/// Order: configured editor, `$VISUAL`, `$EDITOR`, then the platform opener.
/// An editor is assumed to need the terminal; the platform opener is not.
///
/// # Examples
///
/// ```no_run
/// use patch_sorter::sys::resolve_opener;
///
/// let opener = resolve_opener(Some("nvim"));
/// assert_eq!(opener.command, vec!["nvim".to_string()]);
/// ```
pub fn resolve_opener(configured: Option<&str>) -> Opener {
    let from_env = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

    let editor = configured
        .map(str::to_string)
        .filter(|v| !v.trim().is_empty())
        .or_else(|| from_env("VISUAL"))
        .or_else(|| from_env("EDITOR"));

    match editor {
        Some(editor) => Opener {
            command: editor.split_whitespace().map(str::to_string).collect(),
            interactive: true,
        },
        None => Opener {
            command: vec![platform_opener().to_string()],
            interactive: false,
        },
    }
}

#[cfg(target_os = "macos")]
fn platform_opener() -> &'static str {
    "open"
}

#[cfg(all(unix, not(target_os = "macos")))]
fn platform_opener() -> &'static str {
    "xdg-open"
}

#[cfg(not(unix))]
fn platform_opener() -> &'static str {
    "explorer"
}

/// Open a file with the given opener.
///
/// Interactive openers are waited on, with the terminal inherited. Platform
/// openers have their output discarded; a quick exit is checked for failure,
/// and one still running after [`OPENER_GRACE`] is reaped in the background.
pub fn open_path(opener: &Opener, path: &Path) -> crate::Result<()> {
    let (program, args) = opener
        .command
        .split_first()
        .ok_or_else(|| crate::Error::InvalidInput("Empty opener command".to_string()))?;

    let mut command = Command::new(program);
    command.args(args).arg(path);
    tracing::info!(program = %program, path = %path.display(), "opening patch");

    let status = if opener.interactive {
        command
            .status()
            .map_err(|e| crate::Error::Other(format!("Failed to run {}: {}", program, e)))?
    } else {
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| crate::Error::Other(format!("Failed to run {}: {}", program, e)))?;
        match child.wait_timeout(OPENER_GRACE)? {
            Some(status) => status,
            None => {
                let program = program.clone();
                thread::spawn(move || match child.wait() {
                    Ok(status) => tracing::debug!(program = %program, %status, "opener exited"),
                    Err(e) => tracing::warn!(program = %program, error = %e, "failed to reap opener"),
                });
                return Ok(());
            }
        }
    };

    if !status.success() {
        return Err(crate::Error::Other(format!(
            "{} exited with {}",
            program, status
        )));
    }
    Ok(())
}
