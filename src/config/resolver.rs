//! Unified precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Project config (`psort.kdl` in the working directory)
//! 3. System config (`~/.config/patch-sorter/config.kdl`)
//! 4. Built-in defaults
//!
//! Relative paths are resolved against the working directory.

use super::schema::{
    DEFAULT_CHECKOUT_DIR, DEFAULT_PATCHES_SUBDIR, DEFAULT_REPO_URL, DEFAULT_TAGS_FILE,
    OutputFormat, SorterConfig,
};
use crate::{Error, Result};
use kdl::KdlDocument;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// File name of the project config, looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "psort.kdl";

/// Environment variable overriding the system config directory.
pub const CONFIG_HOME_ENV: &str = "PSORT_CONFIG_HOME";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from CLI flag
    CliFlag,
    /// Value from the project config file
    Project,
    /// Value from the system config file
    System,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Project => write!(f, "project"),
            ValueSource::System => write!(f, "system"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

impl Serialize for ValueSource {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, Serialize)]
pub struct Resolved<T> {
    /// The resolved value
    pub value: T,
    /// Where the value came from
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    /// Create a new resolved value.
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Values passed on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub patches_dir: Option<PathBuf>,
    pub tags_file: Option<PathBuf>,
    pub editor: Option<String>,
    pub output_format: Option<OutputFormat>,
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// Directory relative paths were resolved against
    #[serde(skip)]
    pub work_dir: PathBuf,
    /// Directory the upstream repository is cloned into
    pub checkout_dir: Resolved<PathBuf>,
    /// Directory holding the patch files
    pub patches_dir: Resolved<PathBuf>,
    /// Repository cloned when the patches are missing
    pub repo_url: Resolved<String>,
    /// Tags file
    pub tags_file: Resolved<PathBuf>,
    /// Command used to open patches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor: Option<Resolved<String>>,
    /// Output format preference
    pub output_format: Resolved<OutputFormat>,
}

impl ResolvedConfig {
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn patches_dir(&self) -> &Path {
        &self.patches_dir.value
    }

    pub fn checkout_dir(&self) -> &Path {
        &self.checkout_dir.value
    }

    pub fn tags_file(&self) -> &Path {
        &self.tags_file.value
    }

    pub fn repo_url(&self) -> &str {
        &self.repo_url.value
    }

    pub fn editor(&self) -> Option<&str> {
        self.editor.as_ref().map(|r| r.value.as_str())
    }

    pub fn output_format(&self) -> &OutputFormat {
        &self.output_format.value
    }
}

/// Path of the system config file, if a config directory is known.
pub fn system_config_path() -> Option<PathBuf> {
    let base = match std::env::var_os(CONFIG_HOME_ENV) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::config_dir()?.join("patch-sorter"),
    };
    Some(base.join("config.kdl"))
}

/// Read a config file. A missing file is an empty config.
pub fn read_config_file(path: &Path) -> Result<SorterConfig> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SorterConfig::new()),
        Err(e) => {
            return Err(Error::Config(format!(
                "Could not read {}: {}",
                path.display(),
                e
            )));
        }
    };

    let doc: KdlDocument = content
        .parse()
        .map_err(|e| Error::Config(format!("Invalid KDL in {}: {}", path.display(), e)))?;
    let config = SorterConfig::from_kdl(&doc)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    tracing::debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Resolve configuration for a working directory.
pub fn resolve_config(work_dir: &Path, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let system_config = match system_config_path() {
        Some(path) => read_config_file(&path)?,
        None => SorterConfig::new(),
    };
    let project_config = read_config_file(&work_dir.join(PROJECT_CONFIG_FILE))?;

    Ok(resolve_with(work_dir, overrides, &project_config, &system_config))
}

/// Resolve from already loaded config files.
pub fn resolve_with(
    work_dir: &Path,
    overrides: &ConfigOverrides,
    project: &SorterConfig,
    system: &SorterConfig,
) -> ResolvedConfig {
    let pick = |get: fn(&SorterConfig) -> Option<String>, default: &str| -> Resolved<String> {
        if let Some(v) = get(project) {
            Resolved::new(v, ValueSource::Project)
        } else if let Some(v) = get(system) {
            Resolved::new(v, ValueSource::System)
        } else {
            Resolved::new(default.to_string(), ValueSource::Default)
        }
    };
    let absolute = |p: PathBuf| if p.is_absolute() { p } else { work_dir.join(p) };

    let checkout = pick(|c| c.checkout_dir.clone(), DEFAULT_CHECKOUT_DIR);
    let checkout_dir = Resolved::new(absolute(PathBuf::from(&checkout.value)), checkout.source);

    // An explicit patches directory wins; otherwise it lives inside the checkout
    let patches_dir = match overrides.patches_dir {
        Some(ref dir) => Resolved::new(absolute(dir.clone()), ValueSource::CliFlag),
        None => {
            let subdir = pick(|c| c.patches_subdir.clone(), DEFAULT_PATCHES_SUBDIR);
            let source = if subdir.source == ValueSource::Default {
                checkout_dir.source.clone()
            } else {
                subdir.source
            };
            Resolved::new(checkout_dir.value.join(&subdir.value), source)
        }
    };

    let repo_url = pick(|c| c.repo_url.clone(), DEFAULT_REPO_URL);

    let tags_file = match overrides.tags_file {
        Some(ref file) => Resolved::new(absolute(file.clone()), ValueSource::CliFlag),
        None => {
            let file = pick(|c| c.tags_file.clone(), DEFAULT_TAGS_FILE);
            Resolved::new(absolute(PathBuf::from(&file.value)), file.source)
        }
    };

    let editor = if let Some(ref editor) = overrides.editor {
        Some(Resolved::new(editor.clone(), ValueSource::CliFlag))
    } else if let Some(ref editor) = project.editor {
        Some(Resolved::new(editor.clone(), ValueSource::Project))
    } else {
        system
            .editor
            .as_ref()
            .map(|editor| Resolved::new(editor.clone(), ValueSource::System))
    };

    let output_format = if let Some(ref format) = overrides.output_format {
        Resolved::new(format.clone(), ValueSource::CliFlag)
    } else if let Some(ref format) = project.output_format {
        Resolved::new(format.clone(), ValueSource::Project)
    } else if let Some(ref format) = system.output_format {
        Resolved::new(format.clone(), ValueSource::System)
    } else {
        Resolved::new(OutputFormat::Json, ValueSource::Default)
    };

    ResolvedConfig {
        work_dir: work_dir.to_path_buf(),
        checkout_dir,
        patches_dir,
        repo_url,
        tags_file,
        editor,
        output_format,
    }
}
