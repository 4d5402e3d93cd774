//! Storage layer for patch tags.
//!
//! Tags live in a small comma-separated file:
//!
//! ```text
//! patch,categories...
//! Add-API.patch,api
//! Fix-exploit.patch,fix,sec
//! ```
//!
//! The first line is a header and is ignored on read. Every other line holds a
//! patch key followed by the short codes of its categories. Keys without tags
//! never appear, so an untagged patch is simply an absent key.
//!
//! Older files list full patch file names (`0001-Add-API.patch,api`), so a
//! leading `<digits>-` is stripped from every key on read. A key that itself
//! starts with `<digits>-` is written behind a `0-` prefix to survive that.
//!
//! Reads are forgiving: unknown codes are dropped and the rest of the file is
//! still used. Writes go through a sibling temporary file that is renamed over
//! the target, so a crash mid-write leaves the previous file intact.

use crate::models::{Category, CategorySet, strip_ordinal};
use crate::{Error, Result};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Header written as the first line of the tags file.
pub const TAGS_HEADER: &str = "patch,categories...";

/// Mapping from patch key to its categories.
///
/// Invariant: no key maps to an empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagStore {
    tags: BTreeMap<String, CategorySet>,
}

impl TagStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load tags from a file.
    ///
    /// A missing file yields an empty store. Other I/O errors are returned.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let store = Self::parse(&content);
                tracing::debug!(path = %path.display(), keys = store.len(), "loaded tags");
                Ok(store)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no tags file yet");
                Ok(Self::new())
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Load tags, falling back to an empty store if the file can't be read.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to load tags file, starting empty");
                Self::new()
            }
        }
    }

    /// Parse the contents of a tags file.
    pub fn parse(content: &str) -> Self {
        let mut store = Self::new();

        for (number, line) in content.lines().enumerate().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut fields = line.split(',').map(str::trim);
            let key = strip_ordinal(fields.next().unwrap_or_default()).trim();
            if key.is_empty() {
                tracing::warn!(line = number + 1, "skipping tags line without a patch key");
                continue;
            }

            let mut set = CategorySet::new();
            for code in fields {
                match Category::by_code(code) {
                    Some(category) => {
                        set.insert(category);
                    }
                    None => {
                        tracing::debug!(line = number + 1, code, "ignoring unknown category code")
                    }
                }
            }

            if !set.is_empty() {
                let entry = store.tags.entry(key.to_string()).or_default();
                for category in set.iter() {
                    entry.insert(category);
                }
            }
        }

        store
    }

    /// Render the tags file contents.
    ///
    /// Keys listed in `order` come first, in that order; any other tagged keys
    /// follow in lexicographic order.
    pub fn render<'a, I>(&self, order: I) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut out = String::new();
        out.push_str(TAGS_HEADER);
        out.push('\n');

        let mut written: HashSet<&str> = HashSet::new();
        for key in order {
            if written.contains(key) {
                continue;
            }
            if let Some((stored_key, set)) = self.tags.get_key_value(key) {
                push_line(&mut out, stored_key, *set);
                written.insert(stored_key.as_str());
            }
        }
        for (key, set) in &self.tags {
            if !written.contains(key.as_str()) {
                push_line(&mut out, key, *set);
            }
        }

        out
    }

    /// Atomically write the tags file.
    ///
    /// See [`TagStore::render`] for line order. Any failure is returned as
    /// [`Error::Persist`]; the store itself is untouched either way.
    pub fn save<'a, I>(&self, path: &Path, order: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let content = self.render(order);
        write_atomic(path, content.as_bytes()).map_err(|source| Error::Persist {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), keys = self.len(), "saved tags");
        Ok(())
    }

    /// Flip a category on a key and return the key's new set.
    ///
    /// A key whose set becomes empty is removed. Keys the file format can't
    /// hold are rejected and leave the store unchanged.
    pub fn toggle(&mut self, key: &str, category: Category) -> Result<CategorySet> {
        let mut set = self.categories_for(key);
        set.toggle(category);
        self.set(key, set)?;
        Ok(set)
    }

    /// Replace the categories of a key. An empty set removes the key.
    pub fn set(&mut self, key: &str, set: CategorySet) -> Result<()> {
        if set.is_empty() {
            self.tags.remove(key);
        } else {
            check_key(key)?;
            self.tags.insert(key.to_string(), set);
        }
        Ok(())
    }

    /// Categories of a key; empty when the key has none.
    pub fn categories_for(&self, key: &str) -> CategorySet {
        self.tags.get(key).copied().unwrap_or_default()
    }

    /// Number of tagged keys.
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tagged keys and their sets, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, CategorySet)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Reject keys that would not read back as themselves.
fn check_key(key: &str) -> Result<()> {
    if key.is_empty() || key.trim() != key || key.contains([',', '\n', '\r']) {
        return Err(Error::InvalidInput(format!(
            "Patch key {:?} can't be stored in the tags file",
            key
        )));
    }
    Ok(())
}

fn push_line(out: &mut String, key: &str, set: CategorySet) {
    if strip_ordinal(key) != key {
        out.push_str("0-");
    }
    out.push_str(key);
    for category in set.iter() {
        out.push(',');
        out.push_str(category.code());
    }
    out.push('\n');
}

/// Write a file by way of a temporary sibling and a rename.
fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(parent)?;

    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions())?;
    }

    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
