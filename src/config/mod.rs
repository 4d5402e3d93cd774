//! Configuration for Patch Sorter.
//!
//! Settings are read from KDL files:
//!
//! - Project: `psort.kdl` in the working directory
//! - System: `~/.config/patch-sorter/config.kdl` (or `$PSORT_CONFIG_HOME/config.kdl`)
//!
//! Contains:
//! - `checkout-dir` - Where the upstream repository is cloned
//! - `patches-subdir` - Patches directory inside the checkout
//! - `repo-url` - Repository to clone when patches are missing
//! - `tags-file` - Where tags are persisted
//! - `editor` - Command used to open a patch
//! - `output-format` - "json" or "human"
//!
//! ## Precedence
//!
//! CLI flag > project config > system config > defaults
//!
//! Use the [`resolver`] module for unified precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    CONFIG_HOME_ENV, ConfigOverrides, PROJECT_CONFIG_FILE, Resolved, ResolvedConfig, ValueSource,
    read_config_file, resolve_config, resolve_with, system_config_path,
};
pub use schema::{OutputFormat, SorterConfig};
