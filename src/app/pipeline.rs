//! Fetch, refine and load pipeline
//!
//! [`run_pipeline`] drives one [`TablePipeline`] through four steps:
//!
//! 1. list the table queries and download each through the [`Fetcher`]
//! 2. close the fetcher, then open the store and create the destination
//! 3. read every downloaded file and refine it into rows
//! 4. append the rows to the destination
//!
//! The fetcher is closed before any database connection is opened, whether
//! or not the downloads succeeded. A read or refine failure aborts the run;
//! an append that hits an existing key is logged and skipped.

use std::fmt;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::app::fetcher::Fetcher;
use crate::app::models::{DownloadedFile, TableQuery};
use crate::app::store::{ConflictPolicy, RowSet, StoreConnector, TableSpec, TableStore};
use crate::app::table::RawTable;
use crate::constants::store::DEFAULT_BATCH_SIZE;
use crate::errors::{Result, StoreResult, TableResult};

/// How refined rows are appended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub batch_size: usize,
    pub conflict: ConflictPolicy,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            conflict: ConflictPolicy::Fail,
        }
    }
}

/// Table-specific half of a pipeline
#[async_trait]
pub trait TablePipeline: Send + Sync {
    /// Queries to download; the fetcher's client is available for metadata
    async fn list_requests(&self, fetcher: &Fetcher) -> Result<Vec<TableQuery>>;

    /// Destination table definition
    fn destination(&self) -> TableSpec;

    /// Ensure the destination exists
    async fn create_destination(&self, store: &dyn TableStore) -> StoreResult<()> {
        store.create_table_if_absent(&self.destination()).await
    }

    /// Normalize the rows of one downloaded file
    fn refine(&self, table: RawTable) -> TableResult<RowSet>;

    fn load_options(&self) -> LoadOptions {
        LoadOptions::default()
    }
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Table queries listed
    pub requests: usize,
    /// Files downloaded or found in the cache
    pub files: usize,
    /// Files whose rows were appended
    pub files_loaded: usize,
    /// Rows appended
    pub rows_loaded: u64,
    /// Files skipped because their rows were already present
    pub duplicate_files: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requests, {} files, {} loaded ({} rows), {} already present",
            self.requests, self.files, self.files_loaded, self.rows_loaded, self.duplicate_files
        )
    }
}

async fn download_all(
    pipeline: &dyn TablePipeline,
    fetcher: &Fetcher,
) -> Result<(usize, Vec<DownloadedFile>)> {
    let queries = pipeline.list_requests(fetcher).await?;
    info!("Downloading {} table queries", queries.len());

    let mut files = Vec::new();
    for query in &queries {
        let downloaded = fetcher.download(query).await?;
        files.extend(downloaded);
    }
    Ok((queries.len(), files))
}

async fn load_all(
    pipeline: &dyn TablePipeline,
    store: &dyn TableStore,
    files: &[DownloadedFile],
    summary: &mut RunSummary,
) -> Result<()> {
    pipeline.create_destination(store).await?;

    let destination = pipeline.destination();
    let options = pipeline.load_options();

    for file in files {
        let raw = RawTable::read(&file.path).await?;
        let rows = pipeline.refine(raw)?;

        info!("Loading data into {}", destination.qualified_name());
        match store
            .append_rows(
                &destination.schema,
                &destination.name,
                &rows,
                options.batch_size,
                options.conflict,
            )
            .await
        {
            Ok(inserted) => {
                summary.files_loaded += 1;
                summary.rows_loaded += inserted;
            }
            Err(e) if e.is_unique_violation() => {
                warn!(
                    "Integrity error: failed to load {} into {}: {}",
                    file.path.display(),
                    destination.qualified_name(),
                    e
                );
                summary.duplicate_files += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Run `pipeline` end to end
///
/// Consumes the fetcher: it is closed as soon as downloads finish, and the
/// store is connected only afterwards.
pub async fn run_pipeline(
    pipeline: &dyn TablePipeline,
    fetcher: Fetcher,
    connector: &dyn StoreConnector,
) -> Result<RunSummary> {
    info!("Starting pipeline for {}", pipeline.destination().qualified_name());

    let downloaded = download_all(pipeline, &fetcher).await;
    fetcher.close().await;
    let (requests, files) = downloaded?;

    let mut summary = RunSummary {
        requests,
        files: files.len(),
        ..Default::default()
    };

    let store = connector.connect().await?;
    let loaded = load_all(pipeline, store.as_ref(), &files, &mut summary).await;
    store.close().await;
    loaded?;

    info!("Pipeline finished: {}", summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_load_options() {
        let options = LoadOptions::default();
        assert_eq!(options.batch_size, 1_000);
        assert_eq!(options.conflict, ConflictPolicy::Fail);
    }

    #[test]
    fn test_summary_display() {
        let summary = RunSummary {
            requests: 2,
            files: 10,
            files_loaded: 9,
            rows_loaded: 5_570,
            duplicate_files: 1,
        };
        assert_eq!(
            summary.to_string(),
            "2 requests, 10 files, 9 loaded (5570 rows), 1 already present"
        );
    }
}
