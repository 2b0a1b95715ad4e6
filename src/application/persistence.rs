//! Persistence adapter between the quote store and the two storage layers.
//!
//! Durable keys hold the quotes, the selected filter and sync metadata.
//! The last-shown index lives in the ephemeral layer. Write failures are
//! logged and swallowed so a broken disk never aborts a user action.

use serde_json::Value;

use crate::domain::{is_valid_quote, Quote, Selection, SyncMetadata};
use crate::infrastructure::KvStore;

use super::quote_store::QuoteStore;

/// Durable key for the quote list.
pub const QUOTES_KEY: &str = "dqg_quotes_v1";
/// Durable key for the selected category.
pub const FILTER_KEY: &str = "dqg_selected_filter";
/// Durable key for sync metadata.
pub const SYNC_META_KEY: &str = "dqg_sync_meta";
/// Ephemeral key for the last shown quote index.
pub const LAST_INDEX_KEY: &str = "dqg_lastIndex";

/// Maps store state to and from durable and ephemeral storage.
pub struct Persistence {
    durable: KvStore,
    session: KvStore,
}

impl Persistence {
    #[must_use]
    pub const fn new(durable: KvStore, session: KvStore) -> Self {
        Self { durable, session }
    }

    /// Serialize the whole store under [`QUOTES_KEY`].
    pub fn save_quotes(&self, store: &QuoteStore) {
        let json = match serde_json::to_string(store.quotes()) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize quotes");
                return;
            }
        };

        if let Err(e) = self.durable.set(QUOTES_KEY, &json) {
            tracing::error!(error = %e, "Failed to save quotes");
        }
    }

    /// Replace the store with the saved quotes.
    ///
    /// Returns false and leaves `store` untouched when nothing is saved, the
    /// saved value is not JSON, not an array, or any element is invalid.
    pub fn load_quotes(&self, store: &mut QuoteStore) -> bool {
        let raw = match self.durable.get(QUOTES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return false,
            Err(e) => {
                tracing::error!(error = %e, "Error loading saved quotes");
                return false;
            }
        };

        let parsed: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "Saved quotes are not valid JSON, using defaults");
                return false;
            }
        };

        let Some(items) = parsed.as_array().filter(|a| a.iter().all(is_valid_quote)) else {
            tracing::warn!("Invalid saved quotes, using defaults");
            return false;
        };

        match items
            .iter()
            .cloned()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Quote>, _>>()
        {
            Ok(quotes) => {
                tracing::debug!(count = quotes.len(), "Loaded saved quotes");
                store.replace_all(quotes);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Invalid saved quotes, using defaults");
                false
            }
        }
    }

    pub fn save_selection(&self, selection: &Selection) {
        if let Err(e) = self.durable.set(FILTER_KEY, selection.as_str()) {
            tracing::warn!(error = %e, "Could not save filter");
        }
    }

    /// Saved selection, or `All` when absent or unreadable.
    #[must_use]
    pub fn load_selection(&self) -> Selection {
        match self.durable.get(FILTER_KEY) {
            Ok(Some(value)) if !value.is_empty() => Selection::parse(&value),
            Ok(_) => Selection::All,
            Err(e) => {
                tracing::warn!(error = %e, "Could not load filter");
                Selection::All
            }
        }
    }

    pub fn save_last_shown(&self, index: usize) {
        if let Err(e) = self.session.set(LAST_INDEX_KEY, &index.to_string()) {
            tracing::warn!(error = %e, "Session storage unavailable");
        }
    }

    #[must_use]
    pub fn load_last_shown(&self) -> Option<usize> {
        self.session
            .get(LAST_INDEX_KEY)
            .ok()
            .flatten()
            .and_then(|v| v.parse().ok())
    }

    pub fn clear_last_shown(&self) {
        if let Err(e) = self.session.remove(LAST_INDEX_KEY) {
            tracing::warn!(error = %e, "Session storage unavailable");
        }
    }

    /// Drop everything held in the ephemeral layer.
    pub fn clear_session(&self) {
        if let Err(e) = self.session.clear() {
            tracing::warn!(error = %e, "Session storage unavailable");
        }
    }

    pub fn save_sync_meta(&self, meta: &SyncMetadata) {
        let result = serde_json::to_string(meta)
            .map_err(crate::domain::AppError::json_parse)
            .and_then(|json| self.durable.set(SYNC_META_KEY, &json));

        if let Err(e) = result {
            tracing::warn!(error = %e, "Could not save sync metadata");
        }
    }

    #[must_use]
    pub fn load_sync_meta(&self) -> Option<SyncMetadata> {
        let raw = self.durable.get(SYNC_META_KEY).ok().flatten()?;
        serde_json::from_str(&raw).ok()
    }

    /// Remove the saved quotes and selected filter.
    pub fn clear_durable(&self) {
        for key in [QUOTES_KEY, FILTER_KEY] {
            if let Err(e) = self.durable.remove(key) {
                tracing::warn!(key, error = %e, "Could not clear saved value");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_persistence() -> Persistence {
        Persistence::new(KvStore::in_memory().unwrap(), KvStore::in_memory().unwrap())
    }

    #[test]
    fn test_save_then_load_quotes() {
        let p = memory_persistence();
        let mut saved = QuoteStore::seeded();
        saved.push(Quote::new("extra", ""));
        p.save_quotes(&saved);

        let mut loaded = QuoteStore::default();
        assert!(p.load_quotes(&mut loaded));
        assert_eq!(loaded, saved);
    }

    #[test]
    fn test_load_absent_is_noop() {
        let p = memory_persistence();
        let mut store = QuoteStore::seeded();
        assert!(!p.load_quotes(&mut store));
        assert_eq!(store, QuoteStore::seeded());
    }

    #[test]
    fn test_load_malformed_is_noop() {
        let p = memory_persistence();
        let mut store = QuoteStore::seeded();

        for bad in [
            "{not json",
            r#"{"text":"A","category":"X"}"#,
            r#"[{"text":"A","category":"X"},{"text":"","category":"X"}]"#,
        ] {
            p.durable.set(QUOTES_KEY, bad).unwrap();
            assert!(!p.load_quotes(&mut store), "accepted {bad}");
            assert_eq!(store, QuoteStore::seeded());
        }
    }

    #[test]
    fn test_selection_defaults_to_all() {
        let p = memory_persistence();
        assert_eq!(p.load_selection(), Selection::All);

        p.save_selection(&Selection::Category("Life".into()));
        assert_eq!(p.load_selection(), Selection::Category("Life".into()));
    }

    #[test]
    fn test_last_shown_lives_in_session_layer() {
        let p = memory_persistence();
        p.save_last_shown(2);
        assert_eq!(p.load_last_shown(), Some(2));
        assert_eq!(p.durable.get(LAST_INDEX_KEY).unwrap(), None);

        p.clear_last_shown();
        assert_eq!(p.load_last_shown(), None);
    }

    #[test]
    fn test_clear_durable_keeps_sync_meta() {
        let p = memory_persistence();
        p.save_quotes(&QuoteStore::seeded());
        p.save_selection(&Selection::Category("Life".into()));
        p.save_sync_meta(&SyncMetadata::now(4));

        p.clear_durable();

        assert_eq!(p.durable.get(QUOTES_KEY).unwrap(), None);
        assert_eq!(p.load_selection(), Selection::All);
        assert_eq!(p.load_sync_meta().map(|m| m.added_from_server), Some(4));
    }
}
