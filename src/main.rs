//! recipe-sync CLI entry point

use clap::{Parser, Subcommand};
use recipe_sync::{
    commands::{
        cmd_check, cmd_status, cmd_sync, print_schema_report, print_status, print_sync_report,
    },
    config::{Backend, Config},
    error::{Error, Result},
    progress::LogWriterFactory,
    store::{MySqlStore, RelationalStore, SqliteStore},
    sync::{PhaseSelection, SyncOptions},
};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "recipe-sync")]
#[command(version, about = "Sync recipe JSON documents into the recipe database", long_about = None)]
struct Cli {
    /// Path to config file (defaults to ./recipe-sync.toml if present)
    #[arg(short, long, global = true, env = "RECIPE_SYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy ingredients and tag memberships into the database (default)
    Sync {
        /// Run every phase, then roll back instead of committing
        #[arg(long)]
        dry_run: bool,

        /// Run a single phase
        #[arg(long, value_enum, default_value_t = PhaseSelection::All)]
        only: PhaseSelection,
    },

    /// Show document and database totals
    Status,

    /// Verify the database has the tables and columns a sync needs
    Check,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    let config = Config::discover(cli.config.as_deref())?;

    match config.database.backend()? {
        Backend::MySql => {
            let store = MySqlStore::connect(&config.database).await?;
            run_command(&cli, &config, &store).await
        }
        Backend::Sqlite => {
            let store = SqliteStore::connect(&config.database).await?;
            run_command(&cli, &config, &store).await
        }
    }
}

async fn run_command<S: RelationalStore>(cli: &Cli, config: &Config, store: &S) -> Result<()> {
    let default_command = Commands::Sync {
        dry_run: false,
        only: PhaseSelection::All,
    };
    let command = cli.command.as_ref().unwrap_or(&default_command);

    match command {
        Commands::Sync { dry_run, only } => {
            let options = SyncOptions {
                dry_run: *dry_run,
                phases: *only,
            };

            let report = cmd_sync(config, store, options).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_sync_report(&report);
            }
        }

        Commands::Status => {
            let status = cmd_status(config, store).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }

        Commands::Check => {
            let report = cmd_check(store).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_schema_report(&report);
            }

            if !report.is_ok() {
                return Err(Error::Schema(report.problems().join(", ")));
            }
        }
    }

    Ok(())
}
