//! Command handlers for SIDRA ETL CLI
//!
//! This module implements the command handlers that connect CLI arguments
//! to the fetcher, the pipeline and the cache.

use std::time::Instant;

use tracing::info;

use crate::app::cache::CacheManager;
use crate::app::client::SidraClient;
use crate::app::fetcher::Fetcher;
use crate::app::job::JobPipeline;
use crate::app::pipeline::{run_pipeline, TablePipeline};
use crate::app::store::{MemoryStore, PgConnector};
use crate::cli::{CacheAction, CacheArgs, DownloadArgs, RunArgs};
use crate::config::AppConfig;
use crate::errors::Result;

/// Build a fetcher that owns a fresh SIDRA client
async fn build_fetcher(config: &AppConfig) -> Result<Fetcher> {
    let cache = CacheManager::new(config.cache.clone()).await?;
    let client = SidraClient::with_config(config.client.clone())?;
    Ok(Fetcher::new(Box::new(client), cache, config.fetch.clone()))
}

/// Handle the download command
///
/// Downloads every period of one table and prints the cached paths.
pub async fn handle_download(args: DownloadArgs, config: &AppConfig) -> Result<()> {
    let start_time = Instant::now();
    let query = args.to_query();
    info!("Downloading table {}", query.table_id);

    let fetcher = build_fetcher(config).await?;
    let downloaded = fetcher.download(&query).await;
    fetcher.close().await;
    let files = downloaded?;

    for file in &files {
        println!("{}", file);
    }
    info!(
        "Table {}: {} files in {:?}",
        query.table_id,
        files.len(),
        start_time.elapsed()
    );
    Ok(())
}

/// Handle the run command
pub async fn handle_run(args: RunArgs, config: &AppConfig) -> Result<()> {
    let start_time = Instant::now();
    let pipeline = JobPipeline::load(&args.job, &config.database)?;
    info!(
        "Running job {} into {}",
        args.job.display(),
        pipeline.destination().qualified_name()
    );

    let fetcher = build_fetcher(config).await?;

    if args.dry_run {
        let store = MemoryStore::new();
        let summary = run_pipeline(&pipeline, fetcher, &store).await?;
        for statement in store.statements().await {
            println!("{}\n", statement);
        }
        println!("Dry run: {}", summary);
    } else {
        info!("Database: {}", config.database);
        let connector = PgConnector::new(&config.database);
        let summary = run_pipeline(&pipeline, fetcher, &connector).await?;
        println!("{}", summary);
    }

    info!("Job finished in {:?}", start_time.elapsed());
    Ok(())
}

/// Handle cache commands
pub async fn handle_cache(args: CacheArgs, config: &AppConfig) -> Result<()> {
    match args.action {
        CacheAction::List { table } => {
            let cache = CacheManager::new(config.cache.clone()).await?;
            let files = cache.list_table_files(&table).await?;
            if files.is_empty() {
                println!("No cached files for table {}", table);
            }
            for path in files {
                println!("{}", path.display());
            }
            Ok(())
        }
    }
}
