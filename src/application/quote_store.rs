//! In-memory quote store.
//!
//! Insertion order is display order in exports. No uniqueness is enforced
//! here; import and sync decide their own deduplication.

use crate::domain::{seed_quotes, Quote, Selection};

/// Ordered list of quotes, owned by the running session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteStore {
    quotes: Vec<Quote>,
}

impl QuoteStore {
    /// Store holding the fixed seed list.
    #[must_use]
    pub fn seeded() -> Self {
        Self::from_quotes(seed_quotes())
    }

    #[must_use]
    pub const fn from_quotes(quotes: Vec<Quote>) -> Self {
        Self { quotes }
    }

    #[must_use]
    pub fn quotes(&self) -> &[Quote] {
        &self.quotes
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Quote> {
        self.quotes.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    /// Append one quote and return its index.
    pub fn push(&mut self, quote: Quote) -> usize {
        self.quotes.push(quote);
        self.quotes.len() - 1
    }

    /// Append quotes in order.
    pub fn extend(&mut self, quotes: impl IntoIterator<Item = Quote>) {
        self.quotes.extend(quotes);
    }

    pub fn replace_all(&mut self, quotes: Vec<Quote>) {
        self.quotes = quotes;
    }

    /// Keep only the quotes for which `keep` returns true.
    pub fn retain(&mut self, keep: impl FnMut(&Quote) -> bool) {
        self.quotes.retain(keep);
    }

    /// Whether any quote has exactly this text.
    #[must_use]
    pub fn contains_text(&self, text: &str) -> bool {
        self.quotes.iter().any(|q| q.text == text)
    }

    /// Positions of the quotes inside `selection`.
    #[must_use]
    pub fn indices_in(&self, selection: &Selection) -> Vec<usize> {
        self.quotes
            .iter()
            .enumerate()
            .filter(|(_, q)| selection.matches(q))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn reset_to_defaults(&mut self) {
        self.quotes = seed_quotes();
    }
}
