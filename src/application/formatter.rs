//! Terminal rendering for quotes, categories and sync status.
//!
//! Supports plain text, JSON and table listings.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};

use crate::domain::{Quote, QuoteStats, Selection, SyncMetadata};

use super::categories::CategoryIndex;
use super::presenter::QuoteView;
use super::sync_service::SyncReport;

/// Output format options for listings.
#[derive(Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON for programmatic use.
    Json,
    /// Compact table listing.
    Table,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "table" => Ok(Self::Table),
            _ => Err(format!("Unknown format: {s}. Use: text, json, table")),
        }
    }
}

/// Render what the display surface should show.
pub fn format_quote_view(view: &QuoteView) -> String {
    match view {
        QuoteView::Quote { quote, .. } => format!(
            "{}\n{}",
            format!("\"{}\"", quote.text).bold(),
            format!("Category: {}", quote.display_category()).italic()
        ),
        QuoteView::EmptyCategory(name) => {
            format!("No quotes in category \"{name}\".").yellow().to_string()
        }
        QuoteView::EmptyStore => "No quotes available. Add one below!".yellow().to_string(),
        QuoteView::NotFound => "No quote found.".yellow().to_string(),
    }
}

/// Plain text listing, one quote per line.
pub fn format_quotes_text(quotes: &[Quote]) -> String {
    quotes
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{:3}. [{}] {}", i + 1, q.display_category(), q.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Table listing of quotes.
pub fn format_quotes_table(quotes: &[Quote]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "Category", "Quote"]);

    for (i, quote) in quotes.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            truncate(quote.display_category(), 18),
            truncate(&quote.text, 60),
        ]);
    }

    table.to_string()
}

/// Category options with per-category counts, marking the active one.
pub fn format_categories(index: &CategoryIndex, selection: &Selection, quotes: &[Quote]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["", "Category", "Quotes"]);

    for option in index.options() {
        let option_selection = Selection::parse(option);
        let count = quotes.iter().filter(|q| option_selection.matches(q)).count();
        let marker = if option_selection == *selection { "▶" } else { "" };
        let label = match option_selection {
            Selection::All => "All Categories".to_string(),
            Selection::Category(ref c) if c.is_empty() => "(empty)".to_string(),
            Selection::Category(c) => c,
        };
        table.add_row(vec![marker.to_string(), label, count.to_string()]);
    }

    table.to_string()
}

/// One-line sync status.
pub fn format_sync_report(report: &SyncReport) -> String {
    if report.is_failure() {
        let detail = report
            .error
            .as_ref()
            .map(|e| format!(" ({e})"))
            .unwrap_or_default();
        format!("{}{}", report.status.red().bold(), detail.dimmed())
    } else {
        report.status.green().to_string()
    }
}

/// Store and sync summary.
pub fn format_status(
    stats: &QuoteStats,
    selection: &Selection,
    meta: Option<&SyncMetadata>,
) -> String {
    let last_sync = meta.map_or_else(
        || "never".to_string(),
        |m| {
            format!(
                "{} ({} added)",
                m.last_sync.format("%Y-%m-%d %H:%M:%S UTC"),
                m.added_from_server
            )
        },
    );

    [
        "📊 Status".bold().to_string(),
        format!("  Quotes: {}", stats.quote_count.to_string().cyan()),
        format!("  Categories: {}", stats.category_count.to_string().cyan()),
        format!("  From server: {}", stats.server_quotes.to_string().blue()),
        format!("  Selected filter: {}", selection.as_str().green()),
        format!("  Last sync: {}", last_sync.yellow()),
    ]
    .join("\n")
}

/// Truncates a string to max characters with ellipsis.
fn truncate(s: &str, max_len: usize) -> String {
    let s = s.lines().next().unwrap_or(s);
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
