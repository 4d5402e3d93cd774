//! Command implementations for the psort CLI.
//!
//! This module contains the business logic for each CLI command. Every
//! command returns a result type implementing [`Output`], which `main` prints
//! as JSON or human-readable text.

use crate::bootstrap;
use crate::catalog::Catalog;
use crate::config::{PROJECT_CONFIG_FILE, ResolvedConfig, SorterConfig, system_config_path};
use crate::filter::Filter;
use crate::logging;
use crate::models::{Category, CategorySet, PatchName};
use crate::session::Session;
use crate::sys;
use crate::{Error, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error": "{}"}}"#, e))
}

/// Open a session over the configured directories.
///
/// A missing patches directory is reported as [`Error::PatchesDirMissing`] so
/// the caller can point at `psort bootstrap`.
pub fn open_session(config: &ResolvedConfig) -> Result<Session> {
    Session::open(config.patches_dir(), config.tags_file())
}

/// One patch as shown by `list` and `show`.
///
/// `ordinal` is what a numeric argument to `show`, `toggle` and `open` matches.
#[derive(Debug, Serialize)]
pub struct PatchEntry {
    pub file_name: String,
    pub key: String,
    pub ordinal: u32,
    pub tags: CategorySet,
}

impl PatchEntry {
    fn new(patch: &PatchName, tags: CategorySet) -> Self {
        Self {
            file_name: patch.file_name.clone(),
            key: patch.key.clone(),
            ordinal: patch.ordinal,
            tags,
        }
    }
}

#[derive(Serialize)]
pub struct ListResult {
    pub filter: Filter,
    pub total: usize,
    pub count: usize,
    pub patches: Vec<PatchEntry>,
}

impl Output for ListResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        if self.patches.is_empty() {
            lines.push(format!("No patches (filter: {}).", self.filter));
        } else {
            lines.push(format!(
                "{} of {} patches (filter: {}):",
                self.count, self.total, self.filter
            ));
            lines.push(String::new());
            for patch in &self.patches {
                if patch.tags.is_empty() {
                    lines.push(format!("  {:>4}  {}", patch.ordinal, patch.file_name));
                } else {
                    lines.push(format!(
                        "  {:>4}  {} [{}]",
                        patch.ordinal, patch.file_name, patch.tags
                    ));
                }
            }
        }
        lines.join("\n")
    }
}

/// List patches passing a filter.
pub fn list(session: &mut Session, filter: Filter) -> ListResult {
    session.set_filter(filter);
    let patches: Vec<PatchEntry> = session
        .visible()
        .map(|patch| PatchEntry::new(patch, session.categories_of(patch)))
        .collect();
    ListResult {
        filter,
        total: session.catalog().len(),
        count: patches.len(),
        patches,
    }
}

#[derive(Serialize)]
pub struct ShowResult {
    #[serde(flatten)]
    pub patch: PatchEntry,
    pub path: PathBuf,
}

impl Output for ShowResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let tags = if self.patch.tags.is_empty() {
            "(none)".to_string()
        } else {
            self.patch.tags.iter().map(|c| c.name()).collect::<Vec<_>>().join(", ")
        };
        [
            self.patch.file_name.clone(),
            format!("  Key:     {}", self.patch.key),
            format!("  Ordinal: {}", self.patch.ordinal),
            format!("  Tags:    {}", tags),
            format!("  Path:    {}", self.path.display()),
        ]
        .join("\n")
    }
}

fn find<'a>(catalog: &'a Catalog, query: &str) -> Result<&'a PatchName> {
    catalog
        .resolve(query)
        .ok_or_else(|| Error::NotFound(format!("No patch matching '{}'", query)))
}

/// Show a single patch.
pub fn show(session: &Session, query: &str) -> Result<ShowResult> {
    let patch = find(session.catalog(), query)?;
    Ok(ShowResult {
        patch: PatchEntry::new(patch, session.categories_of(patch)),
        path: session.patches_dir().join(&patch.file_name),
    })
}

#[derive(Serialize)]
pub struct ToggleResult {
    pub file_name: String,
    pub key: String,
    pub category: Category,
    pub added: bool,
    pub tags: CategorySet,
    pub tags_file: PathBuf,
}

impl Output for ToggleResult {
    fn to_human(&self) -> String {
        let action = if self.added { "Added" } else { "Removed" };
        let tags = if self.tags.is_empty() {
            "(none)".to_string()
        } else {
            self.tags.to_string()
        };
        format!(
            "{} {} {} {}\n  Tags now: {}",
            action,
            self.category.name(),
            if self.added { "to" } else { "from" },
            self.file_name,
            tags
        )
    }

    fn to_json(&self) -> String {
        json(self)
    }
}

/// Toggle a category on a patch and save.
pub fn toggle(session: &mut Session, query: &str, category: Category) -> Result<ToggleResult> {
    let patch = find(session.catalog(), query)?;
    let (file_name, key) = (patch.file_name.clone(), patch.key.clone());
    let tags = session.toggle_tag_for(&file_name, category)?;
    Ok(ToggleResult {
        file_name,
        key,
        category,
        added: tags.contains(category),
        tags,
        tags_file: session.tags_path().to_path_buf(),
    })
}

#[derive(Serialize)]
pub struct CategoryInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub shortcut: char,
}

#[derive(Serialize)]
pub struct CategoriesResult {
    pub categories: Vec<CategoryInfo>,
}

impl Output for CategoriesResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec!["Categories:".to_string()];
        for c in &self.categories {
            lines.push(format!("  {:<8} {:<12} key: {}", c.code, c.name, c.shortcut));
        }
        lines.join("\n")
    }
}

/// List the category registry.
pub fn categories() -> CategoriesResult {
    CategoriesResult {
        categories: Category::all()
            .iter()
            .map(|c| CategoryInfo {
                code: c.code(),
                name: c.name(),
                shortcut: c.shortcut(),
            })
            .collect(),
    }
}

#[derive(Serialize)]
pub struct CategoryCount {
    pub category: Category,
    pub count: usize,
}

#[derive(Serialize)]
pub struct StatsResult {
    pub total: usize,
    pub tagged: usize,
    pub untagged: usize,
    pub by_category: Vec<CategoryCount>,
    /// Tagged keys with no matching patch in the catalog
    pub orphaned: Vec<String>,
}

impl Output for StatsResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Patches:  {}", self.total),
            format!("Tagged:   {}", self.tagged),
            format!("Untagged: {}", self.untagged),
            String::new(),
            "By category:".to_string(),
        ];
        for entry in &self.by_category {
            lines.push(format!("  {:<12} {}", entry.category.name(), entry.count));
        }
        if !self.orphaned.is_empty() {
            lines.push(String::new());
            lines.push(format!(
                "Tags for {} patch(es) not in the catalog:",
                self.orphaned.len()
            ));
            for key in &self.orphaned {
                lines.push(format!("  {}", key));
            }
        }
        lines.join("\n")
    }
}

/// Summarize tagging progress.
pub fn stats(session: &Session) -> StatsResult {
    let catalog = session.catalog();
    let tags = session.tags();

    let total = catalog.len();
    let untagged = catalog
        .patches()
        .iter()
        .filter(|p| tags.categories_for(&p.key).is_empty())
        .count();
    let by_category = Category::all()
        .iter()
        .map(|category| CategoryCount {
            category: *category,
            count: catalog
                .patches()
                .iter()
                .filter(|p| tags.categories_for(&p.key).contains(*category))
                .count(),
        })
        .collect();
    let orphaned = tags
        .iter()
        .map(|(key, _)| key)
        .filter(|key| !catalog.keys().any(|k| k == *key))
        .map(str::to_string)
        .collect();

    StatsResult {
        total,
        tagged: total - untagged,
        untagged,
        by_category,
        orphaned,
    }
}

#[derive(Serialize)]
pub struct BootstrapResult {
    pub cloned: bool,
    pub repo_url: String,
    pub checkout_dir: PathBuf,
    pub patches_dir: PathBuf,
    pub patch_count: usize,
}

impl Output for BootstrapResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.cloned {
            format!(
                "Cloned {} into {}\n  {} patches in {}",
                self.repo_url,
                self.checkout_dir.display(),
                self.patch_count,
                self.patches_dir.display()
            )
        } else {
            format!(
                "Patches already present: {} patches in {}",
                self.patch_count,
                self.patches_dir.display()
            )
        }
    }
}

/// Fetch the patch source if it's missing (or always, with `force`).
///
/// Blocks until the clone finishes or `cancel` is raised.
pub fn bootstrap(config: &ResolvedConfig, force: bool, cancel: &AtomicBool) -> Result<BootstrapResult> {
    let cloned = bootstrap::ensure_patches(config, force, cancel)?;
    let catalog = Catalog::scan(config.patches_dir())?;
    Ok(BootstrapResult {
        cloned,
        repo_url: config.repo_url().to_string(),
        checkout_dir: config.checkout_dir().to_path_buf(),
        patches_dir: config.patches_dir().to_path_buf(),
        patch_count: catalog.len(),
    })
}

#[derive(Serialize)]
pub struct OpenResult {
    pub path: PathBuf,
    pub opener: Vec<String>,
}

impl Output for OpenResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        format!("Opened {} with {}", self.path.display(), self.opener.join(" "))
    }
}

/// Open a patch with the configured editor or the platform opener.
pub fn open(session: &Session, query: &str, editor: Option<&str>) -> Result<OpenResult> {
    let patch = find(session.catalog(), query)?;
    let path = session.patches_dir().join(&patch.file_name);
    let opener = sys::resolve_opener(editor);
    sys::open_path(&opener, &path)?;
    Ok(OpenResult {
        path,
        opener: opener.command,
    })
}

#[derive(Serialize)]
pub struct ConfigShowResult {
    pub config: ResolvedConfig,
    pub project_config: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_config: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Output for ConfigShowResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let c = &self.config;
        let mut lines = vec![
            format!(
                "checkout-dir:  {} ({})",
                c.checkout_dir.value.display(),
                c.checkout_dir.source
            ),
            format!(
                "patches-dir:   {} ({})",
                c.patches_dir.value.display(),
                c.patches_dir.source
            ),
            format!("repo-url:      {} ({})", c.repo_url.value, c.repo_url.source),
            format!(
                "tags-file:     {} ({})",
                c.tags_file.value.display(),
                c.tags_file.source
            ),
        ];
        match &c.editor {
            Some(editor) => lines.push(format!("editor:        {} ({})", editor.value, editor.source)),
            None => lines.push("editor:        (not set)".to_string()),
        }
        lines.push(format!(
            "output-format: {} ({})",
            c.output_format.value, c.output_format.source
        ));
        lines.push(String::new());
        lines.push(format!("Project config: {}", self.project_config.display()));
        if let Some(ref path) = self.system_config {
            lines.push(format!("System config:  {}", path.display()));
        }
        lines.push(format!(
            "Log directory:  {}",
            logging::describe_log_dir(self.log_dir.as_deref())
        ));
        lines.join("\n")
    }
}

/// Show the resolved configuration and where each value came from.
pub fn config_show(config: &ResolvedConfig, work_dir: &Path) -> ConfigShowResult {
    ConfigShowResult {
        config: config.clone(),
        project_config: work_dir.join(PROJECT_CONFIG_FILE),
        system_config: system_config_path(),
        log_dir: logging::log_dir(),
    }
}

#[derive(Serialize)]
pub struct ConfigInitResult {
    pub path: PathBuf,
    pub created: bool,
}

impl Output for ConfigInitResult {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        if self.created {
            format!("Wrote default config to {}", self.path.display())
        } else {
            format!("Config already exists: {}", self.path.display())
        }
    }
}

/// Write a project config holding the defaults, unless one already exists.
pub fn config_init(work_dir: &Path) -> Result<ConfigInitResult> {
    let path = work_dir.join(PROJECT_CONFIG_FILE);
    if path.exists() {
        return Ok(ConfigInitResult {
            path,
            created: false,
        });
    }

    let mut doc = SorterConfig::defaults().to_kdl();
    doc.autoformat();
    fs::write(&path, doc.to_string())?;
    Ok(ConfigInitResult {
        path,
        created: true,
    })
}
