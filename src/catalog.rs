//! Patch catalog.
//!
//! Turns a snapshot of the patches directory into the ordered list of patches.
//! Files that don't look like `<ordinal>-<description>.patch` are skipped.

use crate::models::{PatchName, strip_ordinal};
use crate::{Error, Result};
use std::fs;
use std::path::Path;

/// Ordered, read-only list of patches.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    patches: Vec<PatchName>,
}

impl Catalog {
    /// Build a catalog from a list of file names.
    ///
    /// Patches are sorted by ordinal. The sort is stable, so patches sharing an
    /// ordinal stay in the order they were listed.
    pub fn load<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patches: Vec<PatchName> = names
            .into_iter()
            .filter_map(|name| {
                let name = name.as_ref();
                let parsed = PatchName::parse(name);
                if parsed.is_none() {
                    tracing::debug!(file = name, "skipping non-patch file");
                }
                parsed
            })
            .collect();
        patches.sort_by_key(|patch| patch.ordinal);
        Self { patches }
    }

    /// Snapshot a directory and build a catalog from its entries.
    pub fn scan(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::PatchesDirMissing(dir.to_path_buf()));
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            match entry.file_name().into_string() {
                Ok(name) => names.push(name),
                Err(name) => tracing::debug!(file = ?name, "skipping non-UTF-8 file name"),
            }
        }

        let catalog = Self::load(names);
        tracing::debug!(dir = %dir.display(), patches = catalog.len(), "scanned patches");
        Ok(catalog)
    }

    pub fn patches(&self) -> &[PatchName] {
        &self.patches
    }

    pub fn get(&self, index: usize) -> Option<&PatchName> {
        self.patches.get(index)
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    /// Keys of every patch, in catalog order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.patches.iter().map(|p| p.key.as_str())
    }

    /// Find a patch by file name, key, or ordinal.
    ///
    /// Accepts `0005-foo.patch`, `foo.patch`, `5` or `0005`. A full file name
    /// whose ordinal has since changed still resolves through its key.
    pub fn resolve(&self, query: &str) -> Option<&PatchName> {
        let query = query.trim();
        if let Some(patch) = self.patches.iter().find(|p| p.file_name == query) {
            return Some(patch);
        }
        if !query.is_empty() && query.bytes().all(|b| b.is_ascii_digit()) {
            let ordinal = query.parse::<u32>().ok()?;
            return self.patches.iter().find(|p| p.ordinal == ordinal);
        }
        let key = strip_ordinal(query);
        self.patches.iter().find(|p| p.key == key)
    }

    /// Position of a patch in the catalog by file name.
    pub fn position(&self, file_name: &str) -> Option<usize> {
        self.patches.iter().position(|p| p.file_name == file_name)
    }
}
