//! Category index and selection handling.

use std::collections::BTreeSet;

use crate::domain::{models::ALL_SENTINEL, Selection};

use super::persistence::Persistence;
use super::quote_store::QuoteStore;

/// Distinct category labels present in the store, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryIndex {
    categories: Vec<String>,
}

impl CategoryIndex {
    /// Recompute the index from the current store.
    #[must_use]
    pub fn build(store: &QuoteStore) -> Self {
        let categories: BTreeSet<&str> = store
            .quotes()
            .iter()
            .map(|q| q.category.as_str())
            .collect();

        Self {
            categories: categories.into_iter().map(String::from).collect(),
        }
    }

    #[must_use]
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Selectable values: `"all"` first, then every category.
    pub fn options(&self) -> impl Iterator<Item = &str> {
        std::iter::once(ALL_SENTINEL).chain(self.categories.iter().map(String::as_str))
    }

    /// Whether `selection` names something in this index.
    #[must_use]
    pub fn contains(&self, selection: &Selection) -> bool {
        match selection {
            Selection::All => true,
            Selection::Category(c) => self.categories.binary_search(c).is_ok(),
        }
    }
}

/// Rebuild the index and settle the active selection.
///
/// `previous` wins over the persisted value. The result falls back to
/// `All` when the category no longer exists, and is always persisted.
pub fn populate_categories(
    store: &QuoteStore,
    persistence: &Persistence,
    previous: Option<Selection>,
) -> (CategoryIndex, Selection) {
    let index = CategoryIndex::build(store);
    let wanted = previous.unwrap_or_else(|| persistence.load_selection());

    let selection = if index.contains(&wanted) {
        wanted
    } else {
        tracing::debug!(selection = %wanted, "Selected category no longer exists, using all");
        Selection::All
    };

    persistence.save_selection(&selection);
    (index, selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Quote;
    use crate::infrastructure::KvStore;

    fn persistence() -> Persistence {
        Persistence::new(KvStore::in_memory().unwrap(), KvStore::in_memory().unwrap())
    }

    #[test]
    fn test_build_sorted_distinct() {
        let mut store = QuoteStore::seeded();
        store.push(Quote::new("again", "Life"));
        store.push(Quote::new("blank", ""));

        let index = CategoryIndex::build(&store);
        assert_eq!(
            index.categories(),
            ["", "Inspiration", "Life", "Motivation"]
        );
        let options: Vec<_> = index.options().collect();
        assert_eq!(options, ["all", "", "Inspiration", "Life", "Motivation"]);
    }

    #[test]
    fn test_populate_keeps_existing_selection() {
        let p = persistence();
        p.save_selection(&Selection::Category("Life".into()));

        let (_, selection) = populate_categories(&QuoteStore::seeded(), &p, None);
        assert_eq!(selection, Selection::Category("Life".into()));
    }

    #[test]
    fn test_populate_falls_back_to_all_and_persists() {
        let p = persistence();
        let store = QuoteStore::from_quotes(vec![Quote::new("only", "Work")]);

        let (_, selection) =
            populate_categories(&store, &p, Some(Selection::Category("Life".into())));
        assert_eq!(selection, Selection::All);
        assert_eq!(p.load_selection(), Selection::All);
    }

    #[test]
    fn test_explicit_previous_beats_saved() {
        let p = persistence();
        p.save_selection(&Selection::Category("Life".into()));

        let (_, selection) = populate_categories(
            &QuoteStore::seeded(),
            &p,
            Some(Selection::Category("Motivation".into())),
        );
        assert_eq!(selection, Selection::Category("Motivation".into()));
        assert_eq!(p.load_selection(), selection);
    }
}
