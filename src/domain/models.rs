//! Domain models for quotes and category selection.
//!
//! A [`Quote`] has no identifier; two quotes are "the same" for
//! deduplication purposes when their `text` matches exactly.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Category used when a quote is added with a blank category.
pub const DEFAULT_CATEGORY: &str = "Uncategorized";

/// Category assigned to every quote mapped from the remote endpoint.
pub const SERVER_CATEGORY: &str = "Server";

/// Sentinel string for the "every category" selection.
pub const ALL_SENTINEL: &str = "all";

/// A single quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// The quote text. Never blank once inside the store.
    pub text: String,
    /// Category label. May be empty.
    pub category: String,
}

impl Quote {
    /// Create a quote without validation.
    pub fn new(text: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            category: category.into(),
        }
    }

    /// Build a quote from raw user input.
    ///
    /// Trims both fields. Returns `None` for blank text; a blank category
    /// becomes [`DEFAULT_CATEGORY`].
    #[must_use]
    pub fn from_input(text: &str, category: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let category = match category.trim() {
            "" => DEFAULT_CATEGORY,
            c => c,
        };

        Some(Self::new(text, category))
    }

    /// Category label for display.
    #[must_use]
    pub fn display_category(&self) -> &str {
        if self.category.is_empty() {
            DEFAULT_CATEGORY
        } else {
            &self.category
        }
    }
}

/// Returns true iff `value` is an object with a non-blank string `text`
/// and a string `category`.
#[must_use]
pub fn is_valid_quote(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        return false;
    };

    let text_ok = obj
        .get("text")
        .and_then(Value::as_str)
        .is_some_and(|t| !t.trim().is_empty());

    text_ok && obj.get("category").is_some_and(Value::is_string)
}

/// Keeps only the values that pass [`is_valid_quote`], converted to quotes.
///
/// Invalid entries are dropped silently.
pub fn filter_valid<'a, I>(values: I) -> Vec<Quote>
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut dropped = 0usize;
    let quotes: Vec<Quote> = values
        .into_iter()
        .filter_map(|v| {
            if !is_valid_quote(v) {
                dropped += 1;
                return None;
            }
            let quote = serde_json::from_value(v.clone()).ok();
            if quote.is_none() {
                dropped += 1;
            }
            quote
        })
        .collect();

    if dropped > 0 {
        tracing::debug!(dropped, kept = quotes.len(), "Dropped invalid quote records");
    }

    quotes
}

/// The fixed seed list used when nothing is stored yet.
#[must_use]
pub fn seed_quotes() -> Vec<Quote> {
    vec![
        Quote::new(
            "The best way to get started is to quit talking and begin doing.",
            "Motivation",
        ),
        Quote::new(
            "Life is what happens when you're busy making other plans.",
            "Life",
        ),
        Quote::new(
            "Success is not final, failure is not fatal: it is the courage to continue that counts.",
            "Inspiration",
        ),
    ]
}

/// Active category filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Every quote.
    #[default]
    All,
    /// Quotes whose category equals this label exactly.
    Category(String),
}

impl Selection {
    /// Parse a stored or user-supplied selection value.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        if value == ALL_SENTINEL {
            Self::All
        } else {
            Self::Category(value.to_string())
        }
    }

    /// The string form persisted to storage.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::All => ALL_SENTINEL,
            Self::Category(c) => c,
        }
    }

    /// Whether `quote` falls inside this selection.
    #[must_use]
    pub fn matches(&self, quote: &Quote) -> bool {
        match self {
            Self::All => true,
            Self::Category(c) => quote.category == *c,
        }
    }
}

impl std::fmt::Display for Selection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary counts for the `list` view.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QuoteStats {
    /// Number of quotes in the store.
    pub quote_count: usize,
    /// Number of distinct categories.
    pub category_count: usize,
    /// Quotes labelled as coming from the server.
    pub server_quotes: usize,
}
