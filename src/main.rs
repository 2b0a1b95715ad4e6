//! Quote Deck - a random quote generator for the terminal.
//!
//! Quotes live in a local `SQLite` key-value store, can be filtered by
//! category, moved in and out as JSON, and merged with a remote collection
//! on a timer.
//!
//! QUICK START:
//!   quote-deck show                       # Random quote
//!   quote-deck add "Stay curious" -c Life # Add a quote
//!   quote-deck filter Life                # Only show Life quotes
//!   quote-deck export                     # Timestamped JSON export
//!   quote-deck shell                      # Interactive mode with background sync

mod application;
mod cli;
mod domain;
mod infrastructure;

use std::future::Future;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, Utc};
use clap::Parser;
use colored::Colorize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    format_categories, format_quote_view, format_quotes_table, format_quotes_text,
    format_status, format_sync_report, spawn_post, OutputFormat, QuoteSession, QuoteView,
    SharedSession, SyncAgent, SyncHandle, SyncReport,
};
use cli::{Cli, Commands, ShellCommand, SHELL_HELP};
use domain::{AppConfig, AppError, Quote, ReconcilePolicy, Selection};
use infrastructure::{ensure_config_exists, load_config, save_config, HttpQuoteSource, KvStore};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
async fn run(cli: Cli) -> domain::Result<()> {
    let format = cli
        .output_format()
        .map_err(|e| AppError::Config { message: e })?;
    let config = load_config(cli.data_dir.as_deref())?;

    match cli.command {
        Commands::Show { category } => cmd_show(&config, category.as_deref(), format)?,
        Commands::Add {
            text,
            category,
            post,
        } => cmd_add(&config, &text, &category, post).await?,
        Commands::List => cmd_list(&config, format)?,
        Commands::Categories => cmd_categories(&config, format)?,
        Commands::Filter { category } => cmd_filter(&config, &category)?,
        Commands::Export { dir, stdout } => cmd_export(&config, dir, stdout)?,
        Commands::Import { file } => cmd_import(&config, &file)?,
        Commands::Sync { policy } => cmd_sync(&config, policy).await?,
        Commands::Watch { interval } => cmd_watch(&config, interval).await?,
        Commands::Status => cmd_status(&config)?,
        Commands::Reset { yes } => cmd_reset(&config, yes)?,
        Commands::Shell => cmd_shell(&config).await?,
        Commands::Config {
            init,
            policy,
            interval,
        } => cmd_config(cli.data_dir.as_deref(), config, init, policy, interval)?,
    }

    Ok(())
}

/// Open the durable store plus a fresh session layer for this process.
fn open_session(config: &AppConfig) -> domain::Result<QuoteSession> {
    let durable = KvStore::open(&config.store_db_path())?;
    let ephemeral = KvStore::in_memory()?;
    Ok(QuoteSession::open(durable, ephemeral))
}

/// Print a quote view, as JSON when asked.
fn print_view(view: &QuoteView, format: OutputFormat) -> domain::Result<()> {
    match (format, view.quote()) {
        (OutputFormat::Json, Some(quote)) => {
            let json = serde_json::to_string_pretty(quote).map_err(AppError::json_parse)?;
            println!("{json}");
        }
        _ => println!("{}", format_quote_view(view)),
    }
    Ok(())
}

/// Show a random quote.
fn cmd_show(
    config: &AppConfig,
    category: Option<&str>,
    format: OutputFormat,
) -> domain::Result<()> {
    let mut session = open_session(config)?;
    let view = match category {
        Some(c) => session.filter_quotes(Selection::parse(c)),
        None => session.show_random(),
    };
    print_view(&view, format)
}

/// Add a quote, optionally posting it to the server.
async fn cmd_add(config: &AppConfig, text: &str, category: &str, post: bool) -> domain::Result<()> {
    let mut session = open_session(config)?;
    let view = session.add_quote(text, category)?;

    println!("{} Quote added!", "✓".green());
    println!("{}", format_quote_view(&view));

    if post || config.sync.post_on_add {
        if let Some(quote) = view.quote() {
            let source = Arc::new(HttpQuoteSource::new(&config.sync)?);
            if let Err(e) = spawn_post(source, quote.clone()).await {
                tracing::error!(error = %e, "Post task ended abnormally");
            }
        }
    }

    Ok(())
}

/// List all quotes.
fn cmd_list(config: &AppConfig, format: OutputFormat) -> domain::Result<()> {
    let session = open_session(config)?;
    let quotes = session.store().quotes();

    match format {
        OutputFormat::Json => println!("{}", session.export_json()?),
        OutputFormat::Table => println!("{}", format_quotes_table(quotes)),
        OutputFormat::Text => println!("{}", format_quotes_text(quotes)),
    }

    Ok(())
}

/// Show categories and the active filter.
fn cmd_categories(config: &AppConfig, format: OutputFormat) -> domain::Result<()> {
    let session = open_session(config)?;

    if matches!(format, OutputFormat::Json) {
        let json = serde_json::to_string_pretty(session.categories().categories())
            .map_err(AppError::json_parse)?;
        println!("{json}");
    } else {
        println!(
            "{}",
            format_categories(
                session.categories(),
                session.selection(),
                session.store().quotes()
            )
        );
    }

    Ok(())
}

/// Set the active filter and show a quote from it.
fn cmd_filter(config: &AppConfig, category: &str) -> domain::Result<()> {
    let mut session = open_session(config)?;
    let view = session.filter_quotes(Selection::parse(category));

    println!("Filter: {}", session.selection().as_str().green());
    println!("{}", format_quote_view(&view));

    Ok(())
}

/// Export quotes as JSON.
fn cmd_export(config: &AppConfig, dir: Option<PathBuf>, stdout: bool) -> domain::Result<()> {
    let session = open_session(config)?;

    if stdout {
        println!("{}", session.export_json()?);
        return Ok(());
    }

    let dir = dir.unwrap_or_else(|| config.exports_dir());
    let path = session.export_to_dir(&dir, Utc::now())?;
    println!(
        "{} Exported {} quotes to {}",
        "✓".green(),
        session.store().len(),
        path.display()
    );

    Ok(())
}

/// Import quotes from a JSON file.
fn cmd_import(config: &AppConfig, file: &Path) -> domain::Result<()> {
    let mut session = open_session(config)?;
    let count = session.import_file(file)?;
    println!("{} Quotes imported successfully! ({count})", "✓".green());
    Ok(())
}

/// Sync once with the server.
async fn cmd_sync(config: &AppConfig, policy: Option<ReconcilePolicy>) -> domain::Result<()> {
    let mut sync_config = config.sync.clone();
    if let Some(policy) = policy {
        sync_config.policy = policy;
    }

    let session = open_session(config)?.shared();
    let source = Arc::new(HttpQuoteSource::new(&sync_config)?);
    let mut agent = SyncAgent::new(source, sync_config, session);

    let report = agent.sync_once().await;
    if let Some(e) = report.error {
        return Err(e);
    }
    println!("{}", format_sync_report(&report));

    Ok(())
}

/// Sync on a timer until Ctrl+C.
async fn cmd_watch(config: &AppConfig, interval: Option<u64>) -> domain::Result<()> {
    let secs = interval.unwrap_or(config.sync.interval_secs).max(1);

    let session = open_session(config)?.shared();
    let source = Arc::new(HttpQuoteSource::new(&config.sync)?);
    let mut handle = SyncAgent::new(source, config.sync.clone(), session)
        .spawn_periodic(Duration::from_secs(secs));

    println!(
        "🔄 Syncing with {} every {secs}s (policy: {}). Press Ctrl+C to stop.",
        config.sync.endpoint.cyan(),
        config.sync.policy
    );

    let mut total_added = 0;
    loop {
        tokio::select! {
            report = handle.next_report() => match report {
                Some(report) => {
                    total_added += report.added();
                    println!(
                        "[{}] {}",
                        Local::now().format("%H:%M:%S"),
                        format_sync_report(&report)
                    );
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    handle.stop().await;
    println!("Stopped. {total_added} quotes added from the server.");

    Ok(())
}

/// Show store and sync status.
fn cmd_status(config: &AppConfig) -> domain::Result<()> {
    let session = open_session(config)?;
    let meta = session.sync_metadata();

    println!(
        "{}",
        format_status(&session.stats(), session.selection(), meta.as_ref())
    );
    println!();
    println!("  Store: {}", config.store_db_path().display());
    println!(
        "  Sync: {} every {}s, policy {}",
        if config.sync.enabled {
            "enabled".green()
        } else {
            "disabled".red()
        },
        config.sync.interval_secs,
        config.sync.policy
    );

    Ok(())
}

/// Restore the default quotes after confirmation.
fn cmd_reset(config: &AppConfig, yes: bool) -> domain::Result<()> {
    if !yes && !confirm("Reset all quotes to the defaults? This cannot be undone.")? {
        println!("Cancelled.");
        return Ok(());
    }

    let mut session = open_session(config)?;
    let view = session.reset_to_defaults();
    println!("{} Quotes reset to defaults.", "✓".green());
    println!("{}", format_quote_view(&view));

    Ok(())
}

/// Ask a yes/no question on stdin.
fn confirm(question: &str) -> domain::Result<bool> {
    print!("{question} [y/N] ");
    std::io::stdout()
        .flush()
        .map_err(|e| AppError::io("Failed to flush stdout", e))?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(|e| AppError::io("Failed to read input", e))?;

    Ok(is_yes(&input))
}

fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Show or edit the configuration file.
fn cmd_config(
    data_dir: Option<&Path>,
    mut config: AppConfig,
    init: bool,
    policy: Option<ReconcilePolicy>,
    interval: Option<u64>,
) -> domain::Result<()> {
    if init {
        let path = ensure_config_exists(data_dir)?;
        println!("Config file: {}", path.display());
    }

    if policy.is_some() || interval.is_some() {
        if let Some(policy) = policy {
            config.sync.policy = policy;
        }
        if let Some(secs) = interval {
            config.sync.interval_secs = secs.max(1);
        }
        save_config(&config)?;
        println!(
            "{} Saved {}",
            "✓".green(),
            config.config_file_path().display()
        );
    } else if !init {
        let content = toml::to_string_pretty(&config).map_err(|e| AppError::Config {
            message: format!("Failed to serialize config: {e}"),
        })?;
        println!("{content}");
    }

    Ok(())
}

/// Transient status line shown in the prompt.
struct StatusLine {
    text: String,
    shown_at: Instant,
}

impl StatusLine {
    fn new(text: String) -> Self {
        Self {
            text,
            shown_at: Instant::now(),
        }
    }
}

fn prompt(status: Option<&StatusLine>, ttl: Duration) -> domain::Result<()> {
    match status.filter(|s| s.shown_at.elapsed() < ttl) {
        Some(s) => print!("quote-deck [{}]> ", s.text.dimmed()),
        None => print!("quote-deck> "),
    }
    std::io::stdout()
        .flush()
        .map_err(|e| AppError::io("Failed to flush stdout", e))
}

/// Next finished background run, or never when sync is off.
async fn next_sync_report(handle: &mut Option<SyncHandle>) -> Option<SyncReport> {
    match handle {
        Some(handle) => handle.next_report().await,
        None => std::future::pending().await,
    }
}

/// Forward input lines over a channel from a plain thread.
///
/// The thread is never joined, so a read blocked on the terminal cannot hold
/// up shutdown. The channel closes at EOF.
fn spawn_line_reader<R: BufRead + Send + 'static>(reader: R) -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        for line in reader.lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read input");
                    break;
                }
            }
        }
    });

    rx
}

/// Interactive session with periodic sync in the background.
async fn cmd_shell(config: &AppConfig) -> domain::Result<()> {
    let session = open_session(config)?.shared();
    let input = spawn_line_reader(std::io::BufReader::new(std::io::stdin()));

    run_shell(config, session, input, tokio::signal::ctrl_c()).await
}

/// The shell loop. Ends on `quit`, end of input, or when `shutdown` fires,
/// including while a manual sync or the reset prompt is waiting.
async fn run_shell<F>(
    config: &AppConfig,
    session: SharedSession,
    mut input: mpsc::UnboundedReceiver<String>,
    shutdown: F,
) -> domain::Result<()>
where
    F: Future<Output = std::io::Result<()>>,
{
    let source = Arc::new(HttpQuoteSource::new(&config.sync)?);
    let ttl = Duration::from_millis(config.display.status_ttl_ms);
    tokio::pin!(shutdown);

    let mut manual = SyncAgent::new(
        Arc::clone(&source),
        config.sync.clone(),
        Arc::clone(&session),
    );
    let mut periodic = config.sync.enabled.then(|| {
        SyncAgent::new(
            Arc::clone(&source),
            config.sync.clone(),
            Arc::clone(&session),
        )
        .spawn_periodic(Duration::from_secs(config.sync.interval_secs.max(1)))
    });
    let mut posts: Vec<JoinHandle<()>> = Vec::new();
    let mut status: Option<StatusLine> = None;

    println!("{}", "Quote Deck".bold());
    println!("Type 'help' for commands.\n");
    println!("{}", format_quote_view(&session.lock().await.restore_display()));

    loop {
        prompt(status.as_ref(), ttl)?;

        let line = tokio::select! {
            line = input.recv() => line,
            Some(report) = next_sync_report(&mut periodic) => {
                println!("\n{}", format_sync_report(&report));
                status = Some(StatusLine::new(report.status));
                continue;
            }
            _ = &mut shutdown => None,
        };

        // End of input or Ctrl+C
        let Some(line) = line else {
            println!();
            break;
        };

        let command = match ShellCommand::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e.yellow());
                continue;
            }
        };

        match command {
            ShellCommand::Quit => break,
            ShellCommand::Help => println!("{SHELL_HELP}"),
            ShellCommand::Sync => {
                let report = tokio::select! {
                    report = manual.sync_once() => report,
                    _ = &mut shutdown => {
                        println!();
                        break;
                    }
                };
                println!("{}", format_sync_report(&report));
                status = Some(StatusLine::new(report.status));
            }
            ShellCommand::Reset => {
                print!("Reset all quotes to the defaults? [y/N] ");
                std::io::stdout()
                    .flush()
                    .map_err(|e| AppError::io("Failed to flush stdout", e))?;
                let answer = tokio::select! {
                    answer = input.recv() => answer.unwrap_or_default(),
                    _ = &mut shutdown => {
                        println!();
                        break;
                    }
                };
                if is_yes(&answer) {
                    let view = session.lock().await.reset_to_defaults();
                    println!("{}", format_quote_view(&view));
                } else {
                    println!("Cancelled.");
                }
            }
            other => {
                let mut guard = session.lock().await;
                match run_shell_command(&mut guard, other, config) {
                    Ok(Some(added)) if config.sync.post_on_add => {
                        posts.push(spawn_post(Arc::clone(&source), added));
                    }
                    Ok(_) => {}
                    Err(e) => eprintln!("{} {}", "Error:".red().bold(), e),
                }
            }
        }
    }

    if let Some(handle) = periodic {
        handle.stop().await;
    }
    for post in posts {
        if let Err(e) = post.await {
            tracing::error!(error = %e, "Post task ended abnormally");
        }
    }

    Ok(())
}

/// Apply one shell command to the session.
///
/// Returns the quote when one was added.
fn run_shell_command(
    session: &mut QuoteSession,
    command: ShellCommand,
    config: &AppConfig,
) -> domain::Result<Option<Quote>> {
    match command {
        ShellCommand::Next => println!("{}", format_quote_view(&session.show_random())),
        ShellCommand::Show => println!("{}", format_quote_view(&session.show_current())),
        ShellCommand::Filter(selection) => {
            println!("{}", format_quote_view(&session.filter_quotes(selection)));
        }
        ShellCommand::Add { text, category } => {
            let view = session.add_quote(&text, &category)?;
            println!("{} Quote added!", "✓".green());
            println!("{}", format_quote_view(&view));
            return Ok(view.quote().cloned());
        }
        ShellCommand::List => println!("{}", format_quotes_table(session.store().quotes())),
        ShellCommand::Categories => println!(
            "{}",
            format_categories(
                session.categories(),
                session.selection(),
                session.store().quotes()
            )
        ),
        ShellCommand::Reload => {
            session.reload();
            println!("{}", format_quote_view(&session.restore_display()));
        }
        ShellCommand::Export(dir) => {
            let dir = dir.unwrap_or_else(|| config.exports_dir());
            let path = session.export_to_dir(&dir, Utc::now())?;
            println!("{} Exported to {}", "✓".green(), path.display());
        }
        ShellCommand::Import(path) => {
            let count = session.import_file(&path)?;
            println!("{} Quotes imported successfully! ({count})", "✓".green());
        }
        ShellCommand::Status => {
            let meta = session.sync_metadata();
            println!(
                "{}",
                format_status(&session.stats(), session.selection(), meta.as_ref())
            );
        }
        // Handled by the shell loop.
        ShellCommand::Sync | ShellCommand::Reset | ShellCommand::Help | ShellCommand::Quit => {}
    }

    Ok(None)
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
