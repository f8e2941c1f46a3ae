//! SIDRA ETL CLI application
//!
//! Command-line interface for downloading IBGE SIDRA tables and loading
//! them into PostgreSQL. Runs on a single-threaded runtime; every request
//! and database call happens in sequence.

use std::fs::OpenOptions;
use std::path::Path;
use std::process;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use sidra_etl::cli::{handle_cache, handle_download, handle_run, Cli, Commands};
use sidra_etl::config::AppConfig;
use sidra_etl::errors::{AppError, ConfigError, Result};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let result = run().await;

    if let Err(e) = result {
        error!(category = e.category(), "{}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Main application logic
async fn run() -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let cli = Cli::parse_args();

    let mut config = AppConfig::load(cli.global.config.clone()).await?;
    if let Some(data_dir) = &cli.global.data_dir {
        config.cache.data_dir = data_dir.clone();
    }

    let level = cli
        .log_level()
        .map(|level| level.to_string().to_lowercase())
        .unwrap_or_else(|| config.logging.level.clone());
    init_logging(&level, config.logging.log_file.as_deref())?;

    info!("SIDRA ETL v{} starting", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Download(args) => {
            info!("Executing download command");
            handle_download(args, &config).await
        }
        Commands::Run(args) => {
            info!("Executing run command");
            handle_run(args, &config).await
        }
        Commands::Cache(args) => {
            info!("Executing cache command");
            handle_cache(args, &config).await
        }
    }
}

/// Install the console subscriber, plus a file writer when configured
fn init_logging(level: &str, log_file: Option<&Path>) -> Result<()> {
    let directive: Directive = format!("sidra_etl={}", level)
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            field: "logging.level".to_string(),
            value: level.to_string(),
            reason: "expected error, warn, info, debug or trace".to_string(),
        })?;
    let filter = EnvFilter::from_default_env().add_directive(directive);

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(AppError::Io)?;
            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();
    Ok(())
}
