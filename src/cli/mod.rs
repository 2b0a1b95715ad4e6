//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool, plus the
//! line commands understood by the interactive shell.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::OutputFormat;
use crate::domain::{ReconcilePolicy, Selection};

/// Quote Deck - random quotes by category, with JSON import/export and server sync.
#[derive(Parser, Debug)]
#[command(name = "quote-deck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Data directory (defaults to ~/.quote-deck).
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Output format for listings: text, json, or table.
    #[arg(short, long, default_value = "table")]
    pub format: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show a random quote.
    Show {
        /// Only pick from this category ("all" for every category).
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Add a new quote.
    Add {
        /// Quote text.
        text: String,

        /// Category (defaults to "Uncategorized").
        #[arg(short, long, default_value = "")]
        category: String,

        /// Also POST the quote to the sync endpoint.
        #[arg(long)]
        post: bool,
    },

    /// List every quote.
    List,

    /// Show categories and the active filter.
    Categories,

    /// Set the active category filter and show a quote from it.
    Filter {
        /// Category name, or "all".
        category: String,
    },

    /// Export all quotes to a timestamped JSON file.
    Export {
        /// Output directory (defaults to <data-dir>/exports).
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// Print the JSON to stdout instead of writing a file.
        #[arg(long)]
        stdout: bool,
    },

    /// Import quotes from a JSON file (appended, not deduplicated).
    Import {
        /// JSON file containing an array of {text, category} objects.
        file: PathBuf,
    },

    /// Sync once with the server now.
    Sync {
        /// Override the configured reconciliation policy.
        #[arg(long)]
        policy: Option<ReconcilePolicy>,
    },

    /// Sync periodically until Ctrl+C.
    Watch {
        /// Seconds between syncs (defaults to the configured interval).
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Show store and sync status.
    Status,

    /// Remove saved quotes and filter, restoring the default quotes.
    Reset {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Interactive session with background sync.
    Shell,

    /// Show or edit configuration.
    Config {
        /// Write the commented default config file if missing.
        #[arg(long)]
        init: bool,

        /// Set the reconciliation policy.
        #[arg(long)]
        policy: Option<ReconcilePolicy>,

        /// Set the sync interval in seconds.
        #[arg(long)]
        interval: Option<u64>,
    },
}

impl Cli {
    /// Parse the output format argument.
    pub fn output_format(&self) -> Result<OutputFormat, String> {
        self.format.parse()
    }
}

/// A line typed into the interactive shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Next,
    Show,
    Filter(Selection),
    Add { text: String, category: String },
    List,
    Categories,
    Sync,
    Reload,
    Export(Option<PathBuf>),
    Import(PathBuf),
    Status,
    Reset,
    Help,
    Quit,
}

impl ShellCommand {
    /// Parse one input line. An empty line means "next quote".
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (cmd, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(c, r)| (c, r.trim()));

        match cmd.to_lowercase().as_str() {
            "" | "next" | "n" => Ok(Self::Next),
            "show" | "s" => Ok(Self::Show),
            "filter" | "f" => {
                if rest.is_empty() {
                    Err("usage: filter <category|all>".into())
                } else {
                    Ok(Self::Filter(Selection::parse(rest)))
                }
            }
            "add" | "a" => {
                let (text, category) = rest.split_once('|').unwrap_or((rest, ""));
                if text.trim().is_empty() {
                    Err("usage: add <text> | <category>".into())
                } else {
                    Ok(Self::Add {
                        text: text.trim().to_string(),
                        category: category.trim().to_string(),
                    })
                }
            }
            "list" | "ls" => Ok(Self::List),
            "categories" | "cats" => Ok(Self::Categories),
            "sync" => Ok(Self::Sync),
            "reload" => Ok(Self::Reload),
            "export" => Ok(Self::Export((!rest.is_empty()).then(|| PathBuf::from(rest)))),
            "import" => {
                if rest.is_empty() {
                    Err("usage: import <file>".into())
                } else {
                    Ok(Self::Import(PathBuf::from(rest)))
                }
            }
            "status" => Ok(Self::Status),
            "reset" => Ok(Self::Reset),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(format!("Unknown command: {other}. Type 'help'.")),
        }
    }
}

/// Help text for the interactive shell.
pub const SHELL_HELP: &str = "\
Commands:
  next | n | <enter>        random quote from all categories
  show | s                  random quote from the active filter
  filter <category|all>     set the category filter
  add <text> | <category>   add a quote
  list                      list all quotes
  categories                list categories
  sync                      sync with the server now
  reload                    re-read saved quotes (session state kept)
  export [dir]              export quotes to JSON
  import <file>             import quotes from JSON
  status                    store and sync status
  reset                     restore the default quotes
  quit                      leave the shell";
