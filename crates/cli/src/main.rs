mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use stepwise_migrate::{MigrationError, Migrator};
use tracing_subscriber::EnvFilter;

use crate::config::{Overrides, StepwiseConfig};

#[derive(Parser)]
#[command(name = "stepwise")]
#[command(about = "Apply numbered SQL migrations exactly once, in order")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./stepwise.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database connection URL (postgres://, mysql:// or sqlite://)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Directory holding the NNNN_name.sql files
    #[arg(long, global = true)]
    dir: Option<String>,

    /// Ledger table name
    #[arg(long, global = true)]
    table: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending migrations
    Run,

    /// Show applied and pending migrations
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", error_chain(&err));
            if let Some(code) = err
                .downcast_ref::<MigrationError>()
                .and_then(MigrationError::code)
            {
                eprintln!("Database error code: {}", code);
            }
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli) -> anyhow::Result<()> {
    let mut config = StepwiseConfig::load(cli.config.as_deref())?;
    config.apply_env();
    config.apply_overrides(&Overrides {
        database_url: cli.database_url,
        dir: cli.dir,
        table: cli.table,
    });

    init_tracing(&config.log_level);

    let migrator = Migrator::connect(config.database_url()?, &config.migration_config()).await?;
    tracing::debug!(
        "Using {} ledger `{}` for {}",
        migrator.dialect(),
        migrator.table(),
        migrator.migrations_dir().display()
    );

    match cli.command {
        Commands::Run => commands::migrate::run(&migrator).await?,
        Commands::Status => commands::migrate::status(&migrator).await?,
    }

    migrator.pool().close().await;
    Ok(())
}

/// Render an error with all of its causes.
///
/// Causes already contained in the message above them are not repeated.
fn error_chain(err: &anyhow::Error) -> String {
    let mut message = err.to_string();
    let mut previous = message.clone();
    for cause in err.chain().skip(1) {
        let text = cause.to_string();
        if !previous.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        previous = text;
    }
    message
}

/// Log to stderr, honouring `RUST_LOG` before the configured level
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
