//! KDL schema definitions for psort.kdl / config.kdl.
//!
//! This module provides:
//! - Rust structs representing the KDL schema
//! - Serialization/deserialization to/from KDL format
//! - Validation functions

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

/// Default directory the upstream repository is cloned into.
pub const DEFAULT_CHECKOUT_DIR: &str = "paper";
/// Default location of the patches inside the checkout.
pub const DEFAULT_PATCHES_SUBDIR: &str = "patches/server";
/// Default upstream repository.
pub const DEFAULT_REPO_URL: &str = "https://github.com/PaperMC/Paper";
/// Default tags file name.
pub const DEFAULT_TAGS_FILE: &str = "paper-categories.csv";

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settings stored in a config file.
///
/// Every field is optional; unset fields fall through to the next source.
///
/// # KDL Schema
///
/// ```kdl
/// checkout-dir "paper"
/// patches-subdir "patches/server"
/// repo-url "https://github.com/PaperMC/Paper"
/// tags-file "paper-categories.csv"
/// editor "nvim"
/// output-format "human"  // or "json"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SorterConfig {
    /// Directory the upstream repository is cloned into
    pub checkout_dir: Option<String>,

    /// Patches directory, relative to the checkout
    pub patches_subdir: Option<String>,

    /// Repository cloned when the patches are missing
    pub repo_url: Option<String>,

    /// Tags file path
    pub tags_file: Option<String>,

    /// Command used to open a patch (e.g., "nvim", "code")
    pub editor: Option<String>,

    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,
}

impl SorterConfig {
    /// Create an empty config with no values set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Config holding every built-in default.
    pub fn defaults() -> Self {
        Self {
            checkout_dir: Some(DEFAULT_CHECKOUT_DIR.to_string()),
            patches_subdir: Some(DEFAULT_PATCHES_SUBDIR.to_string()),
            repo_url: Some(DEFAULT_REPO_URL.to_string()),
            tags_file: Some(DEFAULT_TAGS_FILE.to_string()),
            editor: None,
            output_format: Some(OutputFormat::Json),
        }
    }

    /// Validate the config values.
    ///
    /// Returns an error message if any value is invalid.
    pub fn validate(&self) -> Result<(), String> {
        let paths = [
            ("checkout-dir", &self.checkout_dir),
            ("patches-subdir", &self.patches_subdir),
            ("repo-url", &self.repo_url),
            ("tags-file", &self.tags_file),
            ("editor", &self.editor),
        ];
        for (name, value) in paths {
            if let Some(v) = value {
                if v.trim().is_empty() {
                    return Err(format!("{} must not be empty", name));
                }
            }
        }
        if let Some(ref subdir) = self.patches_subdir {
            if Path::new(subdir).is_absolute() || !descends(subdir) {
                return Err(format!(
                    "patches-subdir must be relative to checkout-dir, got {}",
                    subdir
                ));
            }
        }
        if let Some(ref dir) = self.checkout_dir {
            // The checkout is deleted before every clone
            if !Path::new(dir).is_absolute() && !descends(dir) {
                return Err(format!(
                    "checkout-dir must be below the working directory, got {}",
                    dir
                ));
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document.
    ///
    /// Unknown nodes are ignored. An `output-format` other than json/human is
    /// an error.
    pub fn from_kdl(doc: &KdlDocument) -> Result<Self, String> {
        let config = Self {
            checkout_dir: string_node(doc, "checkout-dir"),
            patches_subdir: string_node(doc, "patches-subdir"),
            repo_url: string_node(doc, "repo-url"),
            tags_file: string_node(doc, "tags-file"),
            editor: string_node(doc, "editor"),
            output_format: match string_node(doc, "output-format") {
                Some(s) => Some(
                    OutputFormat::parse(&s)
                        .ok_or_else(|| format!("output-format must be json or human, got {}", s))?,
                ),
                None => None,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        let fields = [
            ("checkout-dir", self.checkout_dir.clone()),
            ("patches-subdir", self.patches_subdir.clone()),
            ("repo-url", self.repo_url.clone()),
            ("tags-file", self.tags_file.clone()),
            ("editor", self.editor.clone()),
            (
                "output-format",
                self.output_format.as_ref().map(|f| f.as_str().to_string()),
            ),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                let mut node = KdlNode::new(name);
                node.push(KdlEntry::new(KdlValue::String(value)));
                doc.nodes_mut().push(node);
            }
        }

        doc
    }
}

/// Whether a relative path ends up strictly below its base.
fn descends(path: &str) -> bool {
    let mut depth = 0usize;
    for component in Path::new(path).components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::ParentDir => match depth.checked_sub(1) {
                Some(d) => depth = d,
                None => return false,
            },
            _ => {}
        }
    }
    depth > 0
}

/// First string argument of a node, if the node exists.
fn string_node(doc: &KdlDocument, name: &str) -> Option<String> {
    doc.get(name)?
        .entries()
        .first()?
        .value()
        .as_string()
        .map(str::to_string)
}
