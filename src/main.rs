//! # Klipper Docs CLI (`kdocs`)
//!
//! Loads the Klipper documentation into memory on startup and answers
//! queries against it, either once from the command line or continuously
//! through one of the tool servers.
//!
//! ## Usage
//!
//! ```bash
//! kdocs --config ./config/kdocs.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `kdocs search "<query>"` | Ranked full-text search with snippets |
//! | `kdocs get <id>` | Print one document |
//! | `kdocs lookup <option>` | Extract the reference block for a config section |
//! | `kdocs sections` | List sections with document counts |
//! | `kdocs list <section>` | List the documents in a section |
//! | `kdocs stats` | Index totals |
//! | `kdocs sync` | Clone or update the repository, then reindex |
//! | `kdocs serve http` | JSON tool server |
//! | `kdocs serve mcp` | MCP server on stdio |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use klipper_docs::config;
use klipper_docs::service::DocsService;
use klipper_docs::sync::SyncAction;
use klipper_docs::traits::ToolRegistry;
use klipper_docs::{get, logging, lookup, mcp, search, server, stats};

/// Klipper Docs: search and config lookup over Klipper's documentation.
///
/// Reads `./config/kdocs.toml` when present; see
/// `config/kdocs.example.toml` for every setting.
#[derive(Parser)]
#[command(name = "kdocs", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the documentation.
    Search {
        /// Free-text query.
        query: String,

        /// Only return documents from this section.
        #[arg(long)]
        section: Option<String>,

        /// Maximum number of results (defaults to `search.max_results`).
        #[arg(long)]
        limit: Option<usize>,

        /// Include full document bodies in the output.
        #[arg(long)]
        content: bool,
    },

    /// Print a document by id (e.g. `bed-mesh`).
    Get { id: String },

    /// Extract the configuration block for an option such as `bed_mesh`.
    ///
    /// Looks in the config-reference section first, then every other
    /// document, unless `--document` names one.
    Lookup {
        option: String,

        #[arg(long)]
        document: Option<String>,
    },

    /// List sections with document counts.
    Sections,

    /// List the documents in one section.
    List { section: String },

    /// Show index statistics.
    Stats,

    /// Clone or update the configured repository and rebuild the index.
    Sync,

    /// Start a long-running tool server.
    Serve {
        #[command(subcommand)]
        transport: ServeTransport,
    },
}

#[derive(Subcommand)]
enum ServeTransport {
    /// HTTP JSON API on `[server].bind`.
    Http,
    /// MCP over stdin/stdout.
    Mcp,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::resolve_config(cli.config.as_deref())?;
    logging::init(&cfg.logging);

    let service = Arc::new(DocsService::new(cfg));

    if !matches!(cli.command, Commands::Sync) {
        let report = service.load().await?;
        tracing::debug!(
            root = %report.docs_root.display(),
            documents = report.build.documents,
            "documentation loaded"
        );
    }

    match cli.command {
        Commands::Search {
            query,
            section,
            limit,
            content,
        } => search::run_search(&service, &query, section, limit, content).await?,
        Commands::Get { id } => get::run_get(&service, &id).await?,
        Commands::Lookup { option, document } => {
            lookup::run_lookup(&service, &option, document.as_deref()).await?
        }
        Commands::Sections => stats::run_sections(&service).await?,
        Commands::List { section } => stats::run_list(&service, &section).await?,
        Commands::Stats => stats::run_stats(&service).await?,
        Commands::Serve { transport } => {
            let tools = Arc::new(ToolRegistry::with_builtins());
            let _refresher = service.spawn_periodic_refresh();
            match transport {
                ServeTransport::Http => server::run_server(service, tools).await?,
                ServeTransport::Mcp => mcp::run_stdio(service, tools).await?,
            }
        }
        Commands::Sync => run_sync(&service).await?,
    }

    Ok(())
}

/// `kdocs sync`: fetch the repository and rebuild, then report.
async fn run_sync(service: &DocsService) -> anyhow::Result<()> {
    if service.config().repository.is_none() {
        anyhow::bail!("no [repository] configured; nothing to sync");
    }

    let report = service.refresh(true).await?;
    if let Some(sync) = &report.sync {
        let verb = match sync.action {
            SyncAction::Cloned => "Cloned",
            SyncAction::Updated => "Updated",
        };
        println!(
            "{} {} at {}",
            verb,
            sync.checkout.display(),
            sync.head.as_deref().unwrap_or("unknown")
        );
    }
    println!(
        "Indexed {} documents ({} terms) in {} ms",
        report.build.documents, report.build.terms, report.build.elapsed_ms
    );

    Ok(())
}
