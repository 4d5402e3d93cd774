//! Patch Sorter - A triage library for a fork's ordered patch set.
//!
//! This library provides the core functionality for the `psort` CLI tool:
//! discovering patches, tagging them with categories, persisting the tags
//! and filtering the patch list by tag.

pub mod bootstrap;
pub mod catalog;
pub mod cli;
pub mod commands;
pub mod config;
pub mod filter;
pub mod logging;
pub mod models;
pub mod session;
pub mod storage;
pub mod sys;
pub mod tui;

use std::path::PathBuf;


/// Library-level error type for Patch Sorter operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Writing the tags file failed. Tags changed in memory are not on disk.
    #[error("Failed to save tags to {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Bootstrap failed: {0}")]
    Bootstrap(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Patches directory not found: {}", .0.display())]
    PatchesDirMissing(PathBuf),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Patch Sorter operations.
pub type Result<T> = std::result::Result<T, Error>;
