//! Merging a remote batch into the local store.
//!
//! There is no versioning and no per-field merge: a quote is identified by
//! its text alone.

use crate::domain::{filter_valid, Quote, ReconcilePolicy, SERVER_CATEGORY};
use crate::infrastructure::RemotePost;

use super::quote_store::QuoteStore;

/// Text used when a remote record has neither title nor body.
pub const UNTITLED_TEXT: &str = "Untitled from server";

/// Map remote records to server-labelled quotes, dropping invalid results.
#[must_use]
pub fn map_remote(posts: &[RemotePost]) -> Vec<Quote> {
    let values: Vec<serde_json::Value> = posts
        .iter()
        .map(|post| {
            let text = post
                .title
                .as_deref()
                .or(post.body.as_deref())
                .unwrap_or_else(|| {
                    tracing::debug!(id = ?post.id, "Remote record has no title or body");
                    UNTITLED_TEXT
                });
            serde_json::json!({ "text": text, "category": SERVER_CATEGORY })
        })
        .collect();

    filter_valid(&values)
}

/// Merge `remote` into `store` and return how many quotes were added.
///
/// Under [`ReconcilePolicy::AppendNovel`] the check runs against the store
/// as it grows, so a text repeated inside one batch is added only once.
pub fn reconcile(store: &mut QuoteStore, remote: Vec<Quote>, policy: ReconcilePolicy) -> usize {
    match policy {
        ReconcilePolicy::AppendNovel => {
            let mut added = 0;
            for quote in remote {
                if !store.contains_text(&quote.text) {
                    store.push(quote);
                    added += 1;
                }
            }
            added
        }
        ReconcilePolicy::ReplaceServer => {
            let before = store.len();
            store.retain(|q| q.category != SERVER_CATEGORY);
            tracing::debug!(removed = before - store.len(), "Dropped previous server quotes");

            let added = remote.len();
            store.extend(remote);
            added
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(title: Option<&str>, body: Option<&str>) -> RemotePost {
        RemotePost {
            id: None,
            title: title.map(String::from),
            body: body.map(String::from),
        }
    }

    fn texts(store: &QuoteStore) -> Vec<&str> {
        store.quotes().iter().map(|q| q.text.as_str()).collect()
    }

    #[test]
    fn test_map_remote_fallback_chain() {
        let quotes = map_remote(&[
            post(Some("Title"), Some("Body")),
            post(None, Some("Body only")),
            post(None, None),
            post(Some("   "), None),
        ]);

        let got: Vec<_> = quotes.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(got, ["Title", "Body only", UNTITLED_TEXT]);
        assert!(quotes.iter().all(|q| q.category == SERVER_CATEGORY));
    }

    #[test]
    fn test_append_novel_skips_known_text() {
        let mut store = QuoteStore::from_quotes(vec![Quote::new("A", "Mine")]);
        let remote = vec![Quote::new("A", SERVER_CATEGORY), Quote::new("B", SERVER_CATEGORY)];

        let added = reconcile(&mut store, remote, ReconcilePolicy::AppendNovel);

        assert_eq!(added, 1);
        assert_eq!(texts(&store), ["A", "B"]);
        assert_eq!(store.get(0).unwrap().category, "Mine");
    }

    #[test]
    fn test_append_novel_dedupes_within_batch() {
        let mut store = QuoteStore::default();
        let remote = vec![Quote::new("B", SERVER_CATEGORY), Quote::new("B", SERVER_CATEGORY)];

        assert_eq!(reconcile(&mut store, remote, ReconcilePolicy::AppendNovel), 1);
        assert_eq!(texts(&store), ["B"]);
    }

    #[test]
    fn test_append_novel_is_idempotent() {
        let mut store = QuoteStore::seeded();
        let remote = vec![Quote::new("B", SERVER_CATEGORY)];

        reconcile(&mut store, remote.clone(), ReconcilePolicy::AppendNovel);
        let added = reconcile(&mut store, remote, ReconcilePolicy::AppendNovel);

        assert_eq!(added, 0);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_replace_server_swaps_previous_batch() {
        let mut store = QuoteStore::from_quotes(vec![
            Quote::new("Local", "Life"),
            Quote::new("Old", SERVER_CATEGORY),
        ]);
        let remote = vec![
            Quote::new("New 1", SERVER_CATEGORY),
            Quote::new("New 2", SERVER_CATEGORY),
        ];

        let added = reconcile(&mut store, remote, ReconcilePolicy::ReplaceServer);

        assert_eq!(added, 2);
        assert_eq!(texts(&store), ["Local", "New 1", "New 2"]);
    }
}
