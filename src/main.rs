//! # VisionAid CLI (`visionaid`)
//!
//! ## Usage
//!
//! ```bash
//! visionaid --config ./config/visionaid.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `visionaid init` | Create the SQLite database and seed the profile |
//! | `visionaid serve` | Start the HTTP server |
//! | `visionaid scan <kind> <file>` | Analyze a local image file |
//! | `visionaid history` | Show recent scans |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use visionaid::{config, history, logging, migrate, scan_cmd, server};
use visionaid_core::ScanKind;

/// VisionAid: object, text, and currency recognition for a
/// camera-to-speech assistant.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/visionaid.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "visionaid", version)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/visionaid.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema and seed the default profile.
    ///
    /// Idempotent: running it multiple times is safe.
    Init,

    /// Start the HTTP server on `[server].bind`.
    Serve,

    /// Analyze a local image file and print the result as JSON.
    ///
    /// The scan is logged to the history like any HTTP scan.
    Scan {
        /// What to look for: `object`, `text`, or `currency`.
        kind: ScanKind,
        /// Path to a JPEG, PNG, WebP, or GIF image.
        path: PathBuf,
    },

    /// Show recent scans, newest first.
    History {
        /// Number of scans to show (at most 50).
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = config::load_config(&cli.config);
    logging::init_tracing(cli.verbose, loaded.as_ref().ok().map(|c| &c.logging));
    let cfg = loaded?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Scan { kind, path } => {
            scan_cmd::run_scan_cmd(&cfg, kind, &path).await?;
        }
        Commands::History { limit } => {
            history::run_history(&cfg, limit).await?;
        }
    }

    Ok(())
}
