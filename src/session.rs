//! Triage session.
//!
//! A `Session` ties the catalog, the tag store and the active filter together
//! and is the only thing a front end (CLI or TUI) talks to. Every mutation
//! saves the tags file before returning and re-applies the active filter.

use crate::catalog::Catalog;
use crate::filter::{self, Filter};
use crate::models::{Category, CategorySet, PatchName};
use crate::storage::TagStore;
use crate::{Error, Result};
use std::path::{Path, PathBuf};

pub struct Session {
    patches_dir: PathBuf,
    tags_path: PathBuf,
    catalog: Catalog,
    tags: TagStore,
    filter: Filter,
    /// Indices into `catalog` that pass `filter`
    visible: Vec<usize>,
}

impl Session {
    /// Scan the patches directory and load the tags file.
    ///
    /// An unreadable tags file is logged and treated as empty; a missing
    /// patches directory is an error.
    pub fn open(patches_dir: &Path, tags_path: &Path) -> Result<Self> {
        let catalog = Catalog::scan(patches_dir)?;
        let tags = TagStore::load_or_default(tags_path);
        Ok(Self::from_parts(patches_dir, tags_path, catalog, tags))
    }

    /// Build a session from an already loaded catalog and store.
    pub fn from_parts(
        patches_dir: &Path,
        tags_path: &Path,
        catalog: Catalog,
        tags: TagStore,
    ) -> Self {
        let visible = filter::apply(&catalog, &tags, Filter::All);
        Self {
            patches_dir: patches_dir.to_path_buf(),
            tags_path: tags_path.to_path_buf(),
            catalog,
            tags,
            filter: Filter::All,
            visible,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn tags(&self) -> &TagStore {
        &self.tags
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn patches_dir(&self) -> &Path {
        &self.patches_dir
    }

    pub fn tags_path(&self) -> &Path {
        &self.tags_path
    }

    /// Patches passing the active filter, in catalog order.
    pub fn visible(&self) -> impl Iterator<Item = &PatchName> {
        self.visible.iter().filter_map(|i| self.catalog.get(*i))
    }

    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    /// Display line for every visible patch.
    ///
    /// Tagged patches get their codes appended, e.g. `0001-a.patch api,sec`.
    pub fn visible_patches(&self) -> Vec<String> {
        self.visible().map(|patch| self.display(patch)).collect()
    }

    /// Display line for a single patch.
    pub fn display(&self, patch: &PatchName) -> String {
        let categories = self.tags.categories_for(&patch.key);
        if categories.is_empty() {
            patch.file_name.clone()
        } else {
            format!("{} {}", patch.file_name, categories)
        }
    }

    /// Categories of a patch.
    pub fn categories_of(&self, patch: &PatchName) -> CategorySet {
        self.tags.categories_for(&patch.key)
    }

    /// Switch filters. Returns the number of visible patches.
    pub fn set_filter(&mut self, filter: Filter) -> usize {
        self.filter = filter;
        self.refresh();
        self.visible.len()
    }

    /// Toggle a category on the patch at `index` in the visible list.
    ///
    /// The tags file is written before returning. If that write fails the
    /// change stays in memory and the persistence error is returned.
    pub fn toggle_tag(&mut self, index: usize, category: Category) -> Result<CategorySet> {
        let catalog_index = self.catalog_index(index)?;
        self.toggle_at(catalog_index, category)
    }

    /// Toggle a category on a patch addressed by name, key or ordinal.
    pub fn toggle_tag_for(&mut self, query: &str, category: Category) -> Result<CategorySet> {
        let patch = self
            .catalog
            .resolve(query)
            .ok_or_else(|| Error::NotFound(format!("No patch matching '{}'", query)))?;
        let catalog_index = self
            .catalog
            .position(&patch.file_name)
            .ok_or_else(|| Error::NotFound(format!("No patch matching '{}'", query)))?;
        self.toggle_at(catalog_index, category)
    }

    fn toggle_at(&mut self, catalog_index: usize, category: Category) -> Result<CategorySet> {
        let key = self
            .catalog
            .get(catalog_index)
            .map(|p| p.key.clone())
            .ok_or_else(|| Error::NotFound(format!("No patch at index {}", catalog_index)))?;

        let set = self.tags.toggle(&key, category)?;
        tracing::debug!(key = %key, category = %category, tags = %set, "toggled tag");

        self.refresh();
        self.tags.save(&self.tags_path, self.catalog.keys())?;
        Ok(set)
    }

    /// Path of the patch at `index` in the visible list.
    pub fn patch_path(&self, index: usize) -> Result<PathBuf> {
        let catalog_index = self.catalog_index(index)?;
        let patch = self
            .catalog
            .get(catalog_index)
            .ok_or_else(|| Error::NotFound(format!("No patch at index {}", index)))?;
        Ok(self.patches_dir.join(&patch.file_name))
    }

    /// Write the tags file explicitly.
    pub fn save(&self) -> Result<()> {
        self.tags.save(&self.tags_path, self.catalog.keys())
    }

    fn catalog_index(&self, index: usize) -> Result<usize> {
        self.visible.get(index).copied().ok_or_else(|| {
            Error::NotFound(format!(
                "No visible patch at index {} ({} visible)",
                index,
                self.visible.len()
            ))
        })
    }

    fn refresh(&mut self) {
        self.visible = filter::apply(&self.catalog, &self.tags, self.filter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestEnv;
    use std::fs;

    #[test]
    fn test_scenario_tag_save_reload_filter() {
        let env = TestEnv::with_patches(&["0001-a.patch", "0002-b.patch", "0003-c.patch"]);
        let mut session = env.open_session();

        session.toggle_tag(0, Category::Api).unwrap();
        session.toggle_tag(2, Category::Security).unwrap();

        let content = fs::read_to_string(env.tags_path()).unwrap();
        assert_eq!(content, "patch,categories...\na.patch,api\nc.patch,sec\n");

        let mut reloaded = env.open_session();
        reloaded.set_filter(Filter::Category(Category::Api));
        let names: Vec<&str> = reloaded.visible().map(|p| p.file_name.as_str()).collect();
        assert_eq!(names, vec!["0001-a.patch"]);
    }

    #[test]
    fn test_visible_patches_display() {
        let env = TestEnv::with_patches(&["0001-a.patch", "0002-b.patch"]);
        let mut session = env.open_session();
        session.toggle_tag(1, Category::Security).unwrap();
        session.toggle_tag(1, Category::Api).unwrap();

        assert_eq!(
            session.visible_patches(),
            vec!["0001-a.patch".to_string(), "0002-b.patch api,sec".to_string()]
        );
    }

    #[test]
    fn test_tags_survive_renumbering() {
        let env = TestEnv::with_patches(&["0005-foo.patch"]);
        let mut session = env.open_session();
        session.toggle_tag(0, Category::Performance).unwrap();

        fs::remove_file(env.patches_dir().join("0005-foo.patch")).unwrap();
        env.add_patches(&["0007-foo.patch"]);

        let session = env.open_session();
        let patch = session.catalog().get(0).unwrap();
        assert_eq!(patch.file_name, "0007-foo.patch");
        assert!(session.categories_of(patch).contains(Category::Performance));
    }

    #[test]
    fn test_toggle_off_last_tag_removes_line() {
        let env = TestEnv::with_patches(&["0001-a.patch"]);
        let mut session = env.open_session();
        session.toggle_tag(0, Category::Other).unwrap();
        assert!(session.toggle_tag(0, Category::Other).unwrap().is_empty());

        let content = fs::read_to_string(env.tags_path()).unwrap();
        assert_eq!(content, "patch,categories...\n");

        let session = env.open_session();
        assert!(session.tags().categories_for("a.patch").is_empty());
    }

    #[test]
    fn test_filter_is_reapplied_after_toggle() {
        let env = TestEnv::with_patches(&["0001-a.patch", "0002-b.patch"]);
        let mut session = env.open_session();

        assert_eq!(session.set_filter(Filter::Untagged), 2);
        session.toggle_tag(0, Category::BugFix).unwrap();
        let names: Vec<&str> = session.visible().map(|p| p.file_name.as_str()).collect();
        assert_eq!(names, vec!["0002-b.patch"]);

        // Switching filters always starts from the full catalog
        assert_eq!(session.set_filter(Filter::Category(Category::BugFix)), 1);
        assert_eq!(session.set_filter(Filter::All), 2);
    }

    #[test]
    fn test_index_addresses_visible_list() {
        let env = TestEnv::with_patches(&["0001-a.patch", "0002-b.patch", "0003-c.patch"]);
        let mut session = env.open_session();
        session.toggle_tag(2, Category::Api).unwrap();
        session.set_filter(Filter::Category(Category::Api));

        // Index 0 of the filtered list is c.patch
        session.toggle_tag(0, Category::Security).unwrap();
        assert_eq!(
            session.tags().categories_for("c.patch").codes(),
            "api,sec"
        );
        assert_eq!(
            session.patch_path(0).unwrap(),
            env.patches_dir().join("0003-c.patch")
        );
    }

    #[test]
    fn test_out_of_range_index() {
        let env = TestEnv::with_patches(&["0001-a.patch"]);
        let mut session = env.open_session();
        assert!(matches!(
            session.toggle_tag(5, Category::Api),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(session.patch_path(1), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_toggle_by_query() {
        let env = TestEnv::with_patches(&["0001-a.patch", "0002-b.patch"]);
        let mut session = env.open_session();
        session.set_filter(Filter::Untagged);
        session.toggle_tag_for("b.patch", Category::Api).unwrap();
        session.toggle_tag_for("1", Category::Other).unwrap();
        assert_eq!(session.tags().categories_for("b.patch").codes(), "api");
        assert_eq!(session.tags().categories_for("a.patch").codes(), "other");
        assert!(matches!(
            session.toggle_tag_for("zzz.patch", Category::Api),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_save_failure_keeps_memory_state() {
        let env = TestEnv::with_patches(&["0001-a.patch"]);
        let bad_tags = env.path().join("missing-dir").join("tags.csv");
        let mut session = Session::open(&env.patches_dir(), &bad_tags).unwrap();

        let err = session.toggle_tag(0, Category::Api).unwrap_err();
        assert!(matches!(err, Error::Persist { .. }));
        assert!(session.tags().categories_for("a.patch").contains(Category::Api));
        assert_eq!(session.visible_patches(), vec!["0001-a.patch api".to_string()]);
    }

    #[test]
    fn test_comma_in_patch_name_is_refused() {
        let env = TestEnv::with_patches(&["0001-Fix-a,b.patch"]);
        let mut session = env.open_session();
        let err = session.toggle_tag(0, Category::Security).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(session.tags().is_empty());
        assert!(!env.tags_path().exists());
    }

    #[test]
    fn test_orphaned_tags_are_preserved_on_save() {
        let env = TestEnv::with_patches(&["0001-a.patch"]);
        fs::write(env.tags_path(), "patch,categories...\ngone.patch,perf\n").unwrap();

        let mut session = env.open_session();
        session.toggle_tag(0, Category::Api).unwrap();

        let content = fs::read_to_string(env.tags_path()).unwrap();
        assert_eq!(content, "patch,categories...\na.patch,api\ngone.patch,perf\n");
    }

    #[test]
    fn test_missing_patches_dir() {
        let env = TestEnv::new();
        let missing = env.path().join("nowhere");
        assert!(matches!(
            Session::open(&missing, &env.tags_path()),
            Err(Error::PatchesDirMissing(_))
        ));
    }
}
