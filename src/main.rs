//! # Portfolio Index CLI (`pidx`)
//!
//! A thin command-line front end over [`UnifiedIndexManager`].
//!
//! ## Usage
//!
//! ```bash
//! pidx --config ./config/pidx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pidx search "<query>"` | Ranked search across local and remote elements |
//! | `pidx find <name>` | Exact name lookup, local first |
//! | `pidx list <type>` | All elements of one type from both stores |
//! | `pidx stats` | Local counts, remote cache health, unique elements |
//! | `pidx refresh` | Force a remote refresh |
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use portfolio_index::commands;
use portfolio_index::config;
use portfolio_index::manager::UnifiedIndexManager;

/// Portfolio Index CLI: federated search over local and remote portfolio
/// elements.
#[derive(Parser)]
#[command(
    name = "pidx",
    about = "Portfolio Index — federated search over local and remote portfolio elements",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pidx.toml")]
    config: PathBuf,

    /// Print machine-readable JSON instead of a listing.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search elements by name and description.
    Search {
        /// The search query string.
        query: String,

        /// Only search one element type (e.g. `persona`, `skills`).
        #[arg(long = "type")]
        element_type: Option<String>,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,

        /// Also match names within a small edit distance.
        #[arg(long)]
        fuzzy: bool,
    },

    /// Look up an element by exact name.
    Find {
        name: String,
    },

    /// List all elements of a type.
    List {
        /// Element type (e.g. `persona`, `skills`).
        element_type: String,
    },

    /// Show index statistics.
    Stats,

    /// Force a refresh of the remote index.
    Refresh,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;
    let manager = UnifiedIndexManager::from_config(&cfg)?;

    match cli.command {
        Commands::Search {
            query,
            element_type,
            limit,
            fuzzy,
        } => {
            commands::run_search(&manager, &query, element_type, limit, fuzzy, cli.json).await?;
        }
        Commands::Find { name } => {
            commands::run_find(&manager, &name, cli.json).await?;
        }
        Commands::List { element_type } => {
            commands::run_list(&manager, &element_type, cli.json).await?;
        }
        Commands::Stats => {
            // A one-shot process has no warm cache; prime it so stats mean something.
            manager.remote().get_index(false).await;
            commands::run_stats(&manager, cli.json).await?;
        }
        Commands::Refresh => {
            commands::run_refresh(&manager, cli.json).await?;
        }
    }

    Ok(())
}
