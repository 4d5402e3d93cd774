//! Data models for Patch Sorter.
//!
//! This module defines the core data structures:
//! - `Category` - The closed registry of tags a patch can carry
//! - `CategorySet` - A set of categories that always iterates in canonical order
//! - `PatchName` - A patch file name split into its ordinal and lookup key

pub mod patch;

pub use patch::{PatchName, strip_ordinal};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category a patch can be tagged with.
///
/// Declaration order is the canonical order used when tags are written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "api")]
    Api,
    #[serde(rename = "perf")]
    Performance,
    #[serde(rename = "fix")]
    BugFix,
    #[serde(rename = "sec")]
    Security,
    #[serde(rename = "spigot")]
    SpigotFix,
    #[serde(rename = "other")]
    Other,
}

impl Category {
    /// Get all categories in canonical order.
    pub fn all() -> &'static [Category] {
        &[
            Category::Api,
            Category::Performance,
            Category::BugFix,
            Category::Security,
            Category::SpigotFix,
            Category::Other,
        ]
    }

    /// Short code stored in the tags file.
    pub fn code(&self) -> &'static str {
        match self {
            Category::Api => "api",
            Category::Performance => "perf",
            Category::BugFix => "fix",
            Category::Security => "sec",
            Category::SpigotFix => "spigot",
            Category::Other => "other",
        }
    }

    /// Long name shown in listings and accepted on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Category::Api => "api",
            Category::Performance => "performance",
            Category::BugFix => "bug_fix",
            Category::Security => "security",
            Category::SpigotFix => "spigot_fix",
            Category::Other => "other",
        }
    }

    /// Key that toggles this category in the terminal UI.
    pub fn shortcut(&self) -> char {
        match self {
            Category::Api => 'a',
            Category::Performance => 'p',
            Category::BugFix => 'f',
            Category::Security => 's',
            Category::SpigotFix => 't',
            Category::Other => 'o',
        }
    }

    /// Look up a category by its exact short code.
    ///
    /// Returns `None` for unrecognized codes; the tags loader drops those.
    pub fn by_code(code: &str) -> Option<Category> {
        Self::all().iter().copied().find(|c| c.code() == code)
    }

    /// Look up a category by its shortcut key.
    pub fn by_shortcut(key: char) -> Option<Category> {
        Self::all().iter().copied().find(|c| c.shortcut() == key)
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    /// Accepts either the short code or the long name, case-insensitively.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let normalized = lower.replace('-', "_");
        Category::all()
            .iter()
            .copied()
            .find(|c| c.code() == lower || c.name() == normalized)
            .ok_or_else(|| {
                let codes: Vec<&str> = Category::all().iter().map(|c| c.code()).collect();
                format!(
                    "Unknown category: {} (expected one of: {})",
                    s,
                    codes.join(", ")
                )
            })
    }
}

/// A set of categories.
///
/// Iteration and display always follow canonical order, no matter the order
/// in which categories were inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CategorySet(u8);

impl CategorySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn contains(&self, category: Category) -> bool {
        self.0 & category.bit() != 0
    }

    /// Add a category. Returns true if it was not already present.
    pub fn insert(&mut self, category: Category) -> bool {
        let added = !self.contains(category);
        self.0 |= category.bit();
        added
    }

    /// Remove a category. Returns true if it was present.
    pub fn remove(&mut self, category: Category) -> bool {
        let present = self.contains(category);
        self.0 &= !category.bit();
        present
    }

    /// Flip membership of a category. Returns true if it is now present.
    pub fn toggle(&mut self, category: Category) -> bool {
        self.0 ^= category.bit();
        self.contains(category)
    }

    /// Iterate in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = Category> + '_ {
        Category::all().iter().copied().filter(|c| self.contains(*c))
    }

    /// Comma-joined short codes, e.g. `api,sec`.
    pub fn codes(&self) -> String {
        self.iter().map(|c| c.code()).collect::<Vec<_>>().join(",")
    }
}

impl FromIterator<Category> for CategorySet {
    fn from_iter<I: IntoIterator<Item = Category>>(iter: I) -> Self {
        let mut set = CategorySet::new();
        for category in iter {
            set.insert(category);
        }
        set
    }
}

impl fmt::Display for CategorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.codes())
    }
}

impl Serialize for CategorySet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for CategorySet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let categories = Vec::<Category>::deserialize(deserializer)?;
        Ok(categories.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_is_canonical_order() {
        let codes: Vec<&str> = Category::all().iter().map(|c| c.code()).collect();
        assert_eq!(codes, vec!["api", "perf", "fix", "sec", "spigot", "other"]);
    }

    #[test]
    fn test_by_code() {
        assert_eq!(Category::by_code("sec"), Some(Category::Security));
        assert_eq!(Category::by_code("spigot"), Some(Category::SpigotFix));
        assert_eq!(Category::by_code("zzz"), None);
        // Codes are matched exactly
        assert_eq!(Category::by_code("API"), None);
        assert_eq!(Category::by_code("security"), None);
    }

    #[test]
    fn test_shortcuts_are_unique() {
        for category in Category::all() {
            assert_eq!(Category::by_shortcut(category.shortcut()), Some(*category));
        }
        assert_eq!(Category::by_shortcut('z'), None);
    }

    #[test]
    fn test_from_str_accepts_code_and_name() {
        assert_eq!("perf".parse::<Category>().unwrap(), Category::Performance);
        assert_eq!("Performance".parse::<Category>().unwrap(), Category::Performance);
        assert_eq!("bug-fix".parse::<Category>().unwrap(), Category::BugFix);
        assert_eq!("SPIGOT_FIX".parse::<Category>().unwrap(), Category::SpigotFix);
    }

    #[test]
    fn test_from_str_unknown_lists_codes() {
        let err = "nope".parse::<Category>().unwrap_err();
        assert!(err.contains("nope"));
        assert!(err.contains("api, perf, fix, sec, spigot, other"));
    }

    #[test]
    fn test_category_serializes_as_code() {
        let json = serde_json::to_string(&Category::Performance).unwrap();
        assert_eq!(json, r#""perf""#);
    }

    #[test]
    fn test_set_iterates_in_canonical_order() {
        let mut set = CategorySet::new();
        set.insert(Category::Other);
        set.insert(Category::Security);
        set.insert(Category::Api);
        let order: Vec<Category> = set.iter().collect();
        assert_eq!(order, vec![Category::Api, Category::Security, Category::Other]);
        assert_eq!(set.codes(), "api,sec,other");
    }

    #[test]
    fn test_set_insert_remove() {
        let mut set = CategorySet::new();
        assert!(set.insert(Category::BugFix));
        assert!(!set.insert(Category::BugFix));
        assert_eq!(set.len(), 1);
        assert!(set.remove(Category::BugFix));
        assert!(!set.remove(Category::BugFix));
        assert!(set.is_empty());
    }

    #[test]
    fn test_set_toggle() {
        let mut set = CategorySet::new();
        assert!(set.toggle(Category::Api));
        assert!(set.contains(Category::Api));
        assert!(!set.toggle(Category::Api));
        assert!(set.is_empty());
    }

    #[test]
    fn test_set_json() {
        let set: CategorySet = [Category::Security, Category::Api].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["api","sec"]"#);
        let back: CategorySet = serde_json::from_str(r#"["sec","api","sec"]"#).unwrap();
        assert_eq!(back, set);
    }
}
