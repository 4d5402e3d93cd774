//! CLI argument definitions for psort.

use crate::filter::Filter;
use crate::models::Category;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Patch Sorter - Tag a fork's patches by category and triage them by tag.
///
/// Start with `psort bootstrap` to fetch the patches, then `psort tui`.
#[derive(Parser, Debug)]
#[command(name = "psort")]
#[command(author, version, about = "Tag a fork's patch set by category", long_about = None)]
#[command(long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("PSORT_GIT_COMMIT"), ")"))]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Run as if psort was started in <path> instead of the current directory.
    /// Can also be set via PSORT_DIR environment variable.
    #[arg(short = 'C', long = "dir", global = true, env = "PSORT_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Directory holding the patch files (overrides config)
    #[arg(long, global = true)]
    pub patches_dir: Option<PathBuf>,

    /// Tags file (overrides config)
    #[arg(long, global = true)]
    pub tags_file: Option<PathBuf>,

    /// Command used to open patches (overrides config, $VISUAL and $EDITOR)
    #[arg(long, global = true)]
    pub editor: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List patches in order, optionally filtered
    List {
        /// Filter: none, untagged, or a category (api, perf, fix, sec, spigot, other)
        #[arg(short, long, default_value = "none")]
        filter: Filter,
    },

    /// Show one patch and its tags
    Show {
        /// File name, ordinal, or name without the ordinal prefix
        patch: String,
    },

    /// Toggle a category on a patch and save the tags file
    Toggle {
        /// File name, ordinal, or name without the ordinal prefix
        patch: String,

        /// Category code or name (e.g., perf, bug_fix)
        category: Category,
    },

    /// List the available categories
    Categories,

    /// Show tagging progress
    Stats,

    /// Clone the upstream repository if the patches are missing
    Bootstrap {
        /// Clone again even if the patches directory exists
        #[arg(long)]
        force: bool,
    },

    /// Open a patch with the configured editor
    Open {
        /// File name, ordinal, or name without the ordinal prefix
        patch: String,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Interactive terminal UI (requires 'tui' feature)
    #[cfg(feature = "tui")]
    Tui {
        /// Initial filter
        #[arg(short, long, default_value = "none")]
        filter: Filter,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the resolved configuration and where each value came from
    Show,

    /// Write a psort.kdl with the defaults to the working directory
    Init,
}
