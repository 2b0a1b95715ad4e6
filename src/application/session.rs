//! The running quote session.
//!
//! [`QuoteSession`] is the single owner of the quote store, the active
//! selection and both storage layers. The CLI and the sync agent reach it
//! through a [`SharedSession`] handle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::domain::{
    AppError, Quote, QuoteStats, ReconcilePolicy, Result, Selection, SyncMetadata,
    SERVER_CATEGORY,
};
use crate::infrastructure::KvStore;

use super::categories::{populate_categories, CategoryIndex};
use super::persistence::Persistence;
use super::presenter::{show_index, Presenter, QuoteView};
use super::quote_store::QuoteStore;
use super::reconcile::reconcile;
use super::transfer;

/// Handle shared between the command loop and the sync agent.
pub type SharedSession = Arc<Mutex<QuoteSession>>;

/// Quote store plus everything derived from it.
pub struct QuoteSession {
    store: QuoteStore,
    persistence: Persistence,
    presenter: Presenter,
    categories: CategoryIndex,
    selection: Selection,
}

impl QuoteSession {
    /// Open a session over the given storage layers.
    ///
    /// Starts from the seed list, replaces it with saved quotes when they
    /// load cleanly, then settles the category selection.
    #[must_use]
    pub fn open(durable: KvStore, ephemeral: KvStore) -> Self {
        Self::with_presenter(
            Persistence::new(durable, ephemeral),
            Presenter::from_entropy(),
        )
    }

    #[must_use]
    pub fn with_presenter(persistence: Persistence, presenter: Presenter) -> Self {
        let mut store = QuoteStore::seeded();
        let loaded = persistence.load_quotes(&mut store);
        tracing::debug!(loaded, count = store.len(), "Session opened");

        let (categories, selection) = populate_categories(&store, &persistence, None);

        Self {
            store,
            persistence,
            presenter,
            categories,
            selection,
        }
    }

    /// Wrap into a [`SharedSession`].
    #[must_use]
    pub fn shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    /// Re-read durable storage as a fresh start would, keeping the
    /// ephemeral layer.
    pub fn reload(&mut self) {
        self.store = QuoteStore::seeded();
        self.persistence.load_quotes(&mut self.store);
        let (categories, selection) = populate_categories(&self.store, &self.persistence, None);
        self.categories = categories;
        self.selection = selection;
    }

    #[must_use]
    pub const fn store(&self) -> &QuoteStore {
        &self.store
    }

    #[must_use]
    pub const fn categories(&self) -> &CategoryIndex {
        &self.categories
    }

    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Random quote from the whole store.
    pub fn show_random(&mut self) -> QuoteView {
        let candidates = self.store.indices_in(&Selection::All);
        self.presenter.show(&self.store, &self.persistence, &candidates)
    }

    /// Make `selection` active and show a random quote inside it.
    pub fn filter_quotes(&mut self, selection: Selection) -> QuoteView {
        self.persistence.save_selection(&selection);
        self.selection = selection;

        let candidates = self.store.indices_in(&self.selection);
        if let Selection::Category(name) = &self.selection {
            if candidates.is_empty() {
                return QuoteView::EmptyCategory(name.clone());
            }
        }

        self.presenter.show(&self.store, &self.persistence, &candidates)
    }

    /// Random quote inside the active selection.
    pub fn show_current(&mut self) -> QuoteView {
        self.filter_quotes(self.selection.clone())
    }

    /// What to show when the session starts.
    ///
    /// A saved category filter wins; otherwise the quote shown last in this
    /// session, if it still exists; otherwise a random quote.
    pub fn restore_display(&mut self) -> QuoteView {
        if self.selection != Selection::All {
            return self.show_current();
        }

        match self.persistence.load_last_shown() {
            Some(index) if index < self.store.len() => {
                show_index(&self.store, &self.persistence, index)
            }
            _ => self.show_random(),
        }
    }

    /// Add a quote from user input and show it.
    ///
    /// # Errors
    /// Returns [`AppError::InvalidData`] if the text is blank.
    pub fn add_quote(&mut self, text: &str, category: &str) -> Result<QuoteView> {
        let quote = Quote::from_input(text, category).ok_or_else(|| AppError::InvalidData {
            message: "Please provide quote text.".into(),
        })?;

        let index = self.store.push(quote);
        self.persistence.save_quotes(&self.store);
        self.refresh_categories();

        tracing::info!(index, "Added quote");
        Ok(show_index(&self.store, &self.persistence, index))
    }

    /// Import a JSON payload, persist, and refresh categories.
    ///
    /// # Errors
    /// As [`transfer::import_json`]; the store is untouched on error.
    pub fn import_json(&mut self, payload: &str) -> Result<usize> {
        let count = transfer::import_json(&mut self.store, payload)?;
        self.persistence.save_quotes(&self.store);
        self.refresh_categories();
        Ok(count)
    }

    /// Import a JSON file, persist, and refresh categories.
    ///
    /// # Errors
    /// [`AppError::Io`] if the file cannot be read, otherwise as
    /// [`Self::import_json`].
    pub fn import_file(&mut self, path: &Path) -> Result<usize> {
        let payload = transfer::read_payload(path)?;
        self.import_json(&payload)
    }

    /// # Errors
    /// Returns error if serialization fails.
    pub fn export_json(&self) -> Result<String> {
        transfer::export_json(&self.store)
    }

    /// # Errors
    /// Returns error if the export file cannot be written.
    pub fn export_to_dir(&self, dir: &Path, now: DateTime<Utc>) -> Result<PathBuf> {
        transfer::export_to_dir(&self.store, dir, now)
    }

    /// Forget saved quotes and filter, go back to the seed list.
    pub fn reset_to_defaults(&mut self) -> QuoteView {
        self.persistence.clear_durable();
        self.persistence.clear_session();
        self.store.reset_to_defaults();
        self.persistence.save_quotes(&self.store);

        let (categories, selection) =
            populate_categories(&self.store, &self.persistence, Some(Selection::All));
        self.categories = categories;
        self.selection = selection;

        tracing::info!("Reset quotes to defaults");
        self.show_random()
    }

    /// Merge a mapped remote batch, persist, and record sync metadata.
    ///
    /// Returns the number of quotes added.
    pub fn apply_remote(&mut self, remote: Vec<Quote>, policy: ReconcilePolicy) -> usize {
        let added = reconcile(&mut self.store, remote, policy);
        self.persistence.save_quotes(&self.store);
        self.refresh_categories();
        self.persistence.save_sync_meta(&SyncMetadata::now(added));
        added
    }

    #[must_use]
    pub fn sync_metadata(&self) -> Option<SyncMetadata> {
        self.persistence.load_sync_meta()
    }

    #[must_use]
    pub fn stats(&self) -> QuoteStats {
        QuoteStats {
            quote_count: self.store.len(),
            category_count: self.categories.categories().len(),
            server_quotes: self
                .store
                .quotes()
                .iter()
                .filter(|q| q.category == SERVER_CATEGORY)
                .count(),
        }
    }

    /// Rebuild the category index, keeping the current selection if it survives.
    fn refresh_categories(&mut self) {
        let (categories, selection) = populate_categories(
            &self.store,
            &self.persistence,
            Some(self.selection.clone()),
        );
        self.categories = categories;
        self.selection = selection;
    }
}
