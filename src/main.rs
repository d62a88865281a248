//! # Issue Lens CLI (`lens`)
//!
//! ## Usage
//!
//! ```bash
//! lens --config ./config/lens.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lens init` | Create the SQLite cache and its schema |
//! | `lens scan <owner/name>` | Fetch open issues from GitHub into the cache |
//! | `lens analyze <owner/name> "<prompt>"` | Analyze cached issues with the selected LLM backend |
//! | `lens issues <owner/name>` | List cached issues |
//! | `lens repos` | List scanned repositories |
//! | `lens serve` | Start the HTTP API |
//!
//! The LLM backend is chosen from the environment: `OPENAI_API_KEY`, then
//! `ANTHROPIC_API_KEY`, then `GEMINI_API_KEY`, then `OLLAMA_BASE_URL`
//! (with optional `OLLAMA_MODEL`). With none set, a deterministic offline
//! fallback answers instead.
//!
//! Logs go to stderr and are controlled by `LENS_LOG` (default `info`),
//! e.g. `LENS_LOG=issue_lens=debug lens analyze rust-lang/rust "top bugs"`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use issue_lens::{analysis, config, listing, migrate, scan, server};

/// Issue Lens: cache a repository's open GitHub issues and analyze them
/// with an LLM.
#[derive(Parser)]
#[command(name = "lens", version)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when it is missing.
    #[arg(long, global = true, default_value = "./config/lens.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the cache database and schema
    Init,

    /// Fetch a repository's open issues into the cache
    Scan {
        /// Repository as owner/name
        repo: String,
    },

    /// Analyze cached issues against a prompt
    Analyze {
        /// Repository as owner/name
        repo: String,
        /// What to ask about the issues
        prompt: String,
    },

    /// List cached issues of a repository
    Issues {
        repo: String,
    },

    /// List scanned repositories
    Repos,

    /// Start the HTTP API server
    Serve,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LENS_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = if cli.config.exists() {
        config::load_config(&cli.config)?
    } else {
        tracing::debug!(path = %cli.config.display(), "config file not found, using defaults");
        config::Config::minimal()
    };

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Scan { repo } => {
            scan::run_scan(&cfg, &repo).await?;
        }
        Commands::Analyze { repo, prompt } => {
            analysis::run_analyze(&cfg, &repo, &prompt).await?;
        }
        Commands::Issues { repo } => {
            listing::run_issues(&cfg, &repo).await?;
        }
        Commands::Repos => {
            listing::run_repos(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
