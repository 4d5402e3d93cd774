//! Patch list filtering.

use crate::catalog::Catalog;
use crate::models::{Category, CategorySet};
use crate::storage::TagStore;
use serde::{Serialize, Serializer};
use std::fmt;

/// Which patches are visible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Filter {
    /// Every patch
    #[default]
    All,
    /// Patches without any category
    Untagged,
    /// Patches tagged with the given category
    Category(Category),
}

impl Filter {
    /// All selectable filters, in the order a picker should offer them.
    pub fn choices() -> Vec<Filter> {
        let mut choices = vec![Filter::All, Filter::Untagged];
        choices.extend(Category::all().iter().copied().map(Filter::Category));
        choices
    }

    /// Check a patch's categories against this filter.
    pub fn matches(&self, categories: CategorySet) -> bool {
        match self {
            Filter::All => true,
            Filter::Untagged => categories.is_empty(),
            Filter::Category(category) => categories.contains(*category),
        }
    }

    /// The filter after this one in [`Filter::choices`], wrapping around.
    pub fn next(&self) -> Filter {
        let choices = Self::choices();
        let index = choices.iter().position(|f| f == self).unwrap_or(0);
        choices[(index + 1) % choices.len()]
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All => write!(f, "none"),
            Filter::Untagged => write!(f, "untagged"),
            Filter::Category(category) => write!(f, "{}", category.name()),
        }
    }
}

impl std::str::FromStr for Filter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "all" => Ok(Filter::All),
            "untagged" | "uncategorized" | "uncategorised" => Ok(Filter::Untagged),
            _ => s.parse::<Category>().map(Filter::Category),
        }
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Indices of the catalog patches that pass the filter, in catalog order.
///
/// Always evaluated over the full catalog.
pub fn apply(catalog: &Catalog, tags: &TagStore, filter: Filter) -> Vec<usize> {
    catalog
        .patches()
        .iter()
        .enumerate()
        .filter(|(_, patch)| filter.matches(tags.categories_for(&patch.key)))
        .map(|(index, _)| index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Catalog, TagStore) {
        let catalog = Catalog::load([
            "0001-a.patch",
            "0002-b.patch",
            "0003-c.patch",
            "0004-d.patch",
        ]);
        let mut tags = TagStore::new();
        tags.toggle("a.patch", Category::Api).unwrap();
        tags.toggle("c.patch", Category::Security).unwrap();
        tags.toggle("d.patch", Category::Api).unwrap();
        tags.toggle("d.patch", Category::Performance).unwrap();
        (catalog, tags)
    }

    fn names(catalog: &Catalog, indices: &[usize]) -> Vec<String> {
        indices
            .iter()
            .map(|i| catalog.get(*i).unwrap().file_name.clone())
            .collect()
    }

    #[test]
    fn test_all_keeps_everything_in_order() {
        let (catalog, tags) = fixture();
        assert_eq!(apply(&catalog, &tags, Filter::All), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_untagged() {
        let (catalog, tags) = fixture();
        let visible = apply(&catalog, &tags, Filter::Untagged);
        assert_eq!(names(&catalog, &visible), vec!["0002-b.patch"]);
    }

    #[test]
    fn test_category_subset_in_catalog_order() {
        let (catalog, tags) = fixture();
        let visible = apply(&catalog, &tags, Filter::Category(Category::Api));
        assert_eq!(names(&catalog, &visible), vec!["0001-a.patch", "0004-d.patch"]);

        let visible = apply(&catalog, &tags, Filter::Category(Category::Other));
        assert!(visible.is_empty());
    }

    #[test]
    fn test_category_filter_matches_exactly_the_tagged_subset() {
        let (catalog, tags) = fixture();
        for category in Category::all() {
            let visible = apply(&catalog, &tags, Filter::Category(*category));
            let expected: Vec<usize> = (0..catalog.len())
                .filter(|i| {
                    tags.categories_for(&catalog.get(*i).unwrap().key)
                        .contains(*category)
                })
                .collect();
            assert_eq!(visible, expected, "category {}", category);
        }
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("none".parse::<Filter>().unwrap(), Filter::All);
        assert_eq!("all".parse::<Filter>().unwrap(), Filter::All);
        assert_eq!("Uncategorized".parse::<Filter>().unwrap(), Filter::Untagged);
        assert_eq!(
            "sec".parse::<Filter>().unwrap(),
            Filter::Category(Category::Security)
        );
        assert!("bogus".parse::<Filter>().is_err());

        assert_eq!(Filter::All.to_string(), "none");
        assert_eq!(Filter::Category(Category::BugFix).to_string(), "bug_fix");
    }

    #[test]
    fn test_next_cycles_through_choices() {
        let mut filter = Filter::All;
        let mut seen = Vec::new();
        for _ in 0..Filter::choices().len() {
            seen.push(filter);
            filter = filter.next();
        }
        assert_eq!(filter, Filter::All);
        assert_eq!(seen, Filter::choices());
    }
}
