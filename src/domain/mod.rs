//! Domain layer - core types and rules.
//!
//! This layer contains pure domain models and error types
//! without any external dependencies (DB, IO, etc.).

pub mod error;
pub mod models;
pub mod sync;

pub use error::{AppError, Result};
pub use models::{
    filter_valid, is_valid_quote, seed_quotes, Quote, QuoteStats, Selection, SERVER_CATEGORY,
};
pub use sync::{AppConfig, ReconcilePolicy, SyncConfig, SyncMetadata, SyncPhase};
