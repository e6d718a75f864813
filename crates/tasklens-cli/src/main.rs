mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "tasklens",
    version,
    about = "Query understanding and adaptive ranking for vault tasks",
    long_about = "TaskLens parses free-text, possibly multilingual queries into keywords and\n\
        structured property filters, then filters, scores and orders a task snapshot\n\
        exported from a note vault.\n\n\
        Quick start:\n  \
        tasklens search \"p:1 overdue invoices\" --tasks tasks.json\n  \
        tasklens analyze \"what should I do today?\" --tasks tasks.json\n  \
        tasklens terms --property status"
)]
struct Cli {
    /// Enable verbose logging (set log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (default: .tasklens/config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search tasks with a free-text query
    ///
    /// Deterministic by default; `--semantic` turns on the AI-assisted
    /// strategy with multilingual keyword expansion (falls back to the
    /// deterministic parser on any failure).
    ///
    /// Examples:
    ///   tasklens search "fix login bug" --tasks tasks.json
    ///   tasklens search "s:open due:this-week" --tasks tasks.json --sort due,priority
    Search {
        /// The query text
        query: String,

        /// Path to the task snapshot JSON exported by the vault indexer
        #[arg(short, long)]
        tasks: String,

        /// Use the AI-assisted parse strategy
        #[arg(long)]
        semantic: bool,

        /// Comma-separated sort criteria (relevance, due_date, priority, auto)
        #[arg(long)]
        sort: Option<String>,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Emit the full response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Analyze a query conversationally (forced-generic mode)
    ///
    /// Time phrases become context instead of filters and keyword filtering
    /// is relaxed, for "what should I do today?"-style questions.
    Analyze {
        /// The question text
        query: String,

        /// Path to the task snapshot JSON exported by the vault indexer
        #[arg(short, long)]
        tasks: String,

        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<usize>,

        /// Emit the full response as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect the merged property term tables
    ///
    /// Shows canonical category keys with their aliases, symbols and
    /// per-language synonyms, user layer included.
    Terms {
        /// Restrict to one property (priority, status, due_date, time_context)
        #[arg(short, long)]
        property: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config_file = cli.config.as_deref().map(std::path::Path::new);

    match cli.command {
        Commands::Search {
            query,
            tasks,
            semantic,
            sort,
            limit,
            json,
        } => {
            commands::search::run(&query, &tasks, semantic, sort.as_deref(), limit, json, config_file)?;
        }
        Commands::Analyze {
            query,
            tasks,
            limit,
            json,
        } => {
            commands::analyze::run(&query, &tasks, limit, json, config_file)?;
        }
        Commands::Terms { property } => {
            commands::terms::run(property.as_deref(), config_file)?;
        }
    }

    Ok(())
}
