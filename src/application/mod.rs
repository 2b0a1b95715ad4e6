//! Application layer - use cases and orchestration.
//!
//! This layer owns the quote session and everything that reads or mutates
//! it: selection, presentation, import/export and sync.

pub mod categories;
pub mod formatter;
pub mod persistence;
pub mod presenter;
pub mod quote_store;
pub mod reconcile;
pub mod session;
pub mod sync_service;
pub mod transfer;

pub use formatter::{
    format_categories, format_quote_view, format_quotes_table, format_quotes_text,
    format_status, format_sync_report, OutputFormat,
};
pub use presenter::QuoteView;
pub use session::{QuoteSession, SharedSession};
pub use sync_service::{spawn_post, SyncAgent, SyncHandle, SyncReport};
