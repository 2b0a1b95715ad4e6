//! Infrastructure layer - external adapters (database, filesystem, network).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod config;
pub mod kv_store;
pub mod remote;

pub use config::{ensure_config_exists, load_config, save_config};
pub use kv_store::KvStore;
pub use remote::{HttpQuoteSource, QuoteSource, RemotePost};
