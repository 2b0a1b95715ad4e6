//! JSON import and export of the quote store.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::domain::{filter_valid, AppError, Result};

use super::quote_store::QuoteStore;

/// Pretty-printed JSON array of every quote, two-space indent.
///
/// # Errors
/// Returns error if serialization fails.
pub fn export_json(store: &QuoteStore) -> Result<String> {
    serde_json::to_string_pretty(store.quotes()).map_err(AppError::json_parse)
}

/// `quotes-export-<YYYY-MM-DD-HH-MM-SS>.json`
#[must_use]
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("quotes-export-{}.json", now.format("%Y-%m-%d-%H-%M-%S"))
}

/// Write an export file into `dir` and return its path.
///
/// # Errors
/// Returns error if the directory or file cannot be written.
pub fn export_to_dir(store: &QuoteStore, dir: &Path, now: DateTime<Utc>) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::io(format!("Failed to create directory {}", dir.display()), e))?;

    let path = dir.join(export_filename(now));
    let content = export_json(store)?;
    fs::write(&path, content)
        .map_err(|e| AppError::io(format!("Failed to write {}", path.display()), e))?;

    tracing::info!(path = %path.display(), count = store.len(), "Exported quotes");
    Ok(path)
}

/// Append every valid quote from a JSON payload.
///
/// No deduplication against existing quotes. The store is untouched on
/// error.
///
/// # Errors
/// - [`AppError::JsonParse`] if the payload is not JSON.
/// - [`AppError::Format`] if the top-level value is not an array.
/// - [`AppError::Empty`] if no element passes validation.
pub fn import_json(store: &mut QuoteStore, payload: &str) -> Result<usize> {
    let parsed: Value = serde_json::from_str(payload).map_err(AppError::json_parse)?;

    let Value::Array(items) = parsed else {
        return Err(AppError::Format);
    };

    let valid = filter_valid(&items);
    if valid.is_empty() {
        return Err(AppError::Empty);
    }

    let count = valid.len();
    store.extend(valid);

    tracing::info!(imported = count, skipped = items.len() - count, "Imported quotes");
    Ok(count)
}

/// Read an import file.
///
/// # Errors
/// Returns [`AppError::Io`] if the file cannot be read.
pub fn read_payload(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read {}", path.display()), e))
}
