//! Table downloader with deterministic caching
//!
//! For one table the fetcher walks `Init -> MetadataFetched ->
//! PeriodsEnumerated -> PerPeriodDownloading -> Done`: it resolves the
//! classification filter, lists the table's periods, and for each period
//! either finds the response already cached or retrieves and persists it.
//! Everything happens strictly in sequence, one request in flight.
//!
//! Transient retrieval failures are retried with a fixed delay and, unless
//! `max_retries` is configured, without bound. A persistently failing
//! upstream therefore blocks the run; callers needing a bounded runtime must
//! impose an outer timeout.

use tracing::{debug, error, info, warn};

use crate::app::cache::CacheManager;
use crate::app::classifications::unnest;
use crate::app::client::SidraApi;
use crate::app::models::{
    ClassificationFilter, Classifications, DownloadedFile, TableQuery, TableRequest, Territories,
};
use crate::errors::{FetchError, FetchResult};

pub mod config;

pub use config::FetchConfig;

/// Download progress of one table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPhase {
    Init,
    MetadataFetched,
    PeriodsEnumerated,
    PerPeriodDownloading,
    Done,
}

fn enter(table_id: &str, phase: FetchPhase) {
    debug!(table = table_id, phase = ?phase, "Fetch phase");
}

/// Owns the SIDRA client for the duration of the fetch phase
pub struct Fetcher {
    api: Box<dyn SidraApi>,
    cache: CacheManager,
    config: FetchConfig,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    /// Create a fetcher that owns `api`
    pub fn new(api: Box<dyn SidraApi>, cache: CacheManager, config: FetchConfig) -> Self {
        Self { api, cache, config }
    }

    /// The owned client, for metadata lookups while listing requests
    pub fn api(&self) -> &dyn SidraApi {
        self.api.as_ref()
    }

    /// The response cache
    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Download configuration
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Download every period of `query`, dispatching on its classification mode
    pub async fn download(&self, query: &TableQuery) -> FetchResult<Vec<DownloadedFile>> {
        let variables = query.variables.as_deref();
        match &query.classifications {
            ClassificationFilter::Unfiltered => {
                self.download_table_unfiltered(&query.table_id, &query.territories, variables)
                    .await
            }
            ClassificationFilter::Explicit(classifications) => {
                self.download_table_with(
                    &query.table_id,
                    &query.territories,
                    variables,
                    classifications,
                )
                .await
            }
            ClassificationFilter::Unnested => {
                self.download_unnested(&query.table_id, &query.territories, variables)
                    .await
            }
        }
    }

    /// Download every period with no category filter on any classification
    ///
    /// The table's classifications are looked up and each is requested with
    /// an empty category list.
    pub async fn download_table_unfiltered(
        &self,
        table_id: &str,
        territories: &Territories,
        variables: Option<&[String]>,
    ) -> FetchResult<Vec<DownloadedFile>> {
        enter(table_id, FetchPhase::Init);
        let classifications: Classifications = self
            .api
            .get_classifications(table_id)
            .await?
            .into_iter()
            .map(|classification| (classification.id, Vec::new()))
            .collect();
        enter(table_id, FetchPhase::MetadataFetched);

        let files = self
            .download_periods(table_id, territories, variables, &classifications)
            .await?;
        enter(table_id, FetchPhase::Done);
        Ok(files)
    }

    /// Download every period for one explicit classification filter
    pub async fn download_table_with(
        &self,
        table_id: &str,
        territories: &Territories,
        variables: Option<&[String]>,
        classifications: &Classifications,
    ) -> FetchResult<Vec<DownloadedFile>> {
        enter(table_id, FetchPhase::Init);
        let files = self
            .download_periods(table_id, territories, variables, classifications)
            .await?;
        enter(table_id, FetchPhase::Done);
        Ok(files)
    }

    /// Download every period once per concrete category combination
    ///
    /// A table without classifications has a single combination: the
    /// request with no classification filter at all.
    pub async fn download_unnested(
        &self,
        table_id: &str,
        territories: &Territories,
        variables: Option<&[String]>,
    ) -> FetchResult<Vec<DownloadedFile>> {
        enter(table_id, FetchPhase::Init);
        let metadata = self.api.get_classifications(table_id).await?;
        enter(table_id, FetchPhase::MetadataFetched);

        let mut files = Vec::new();
        if metadata.is_empty() {
            warn!(
                "Table {} has no classifications; downloading it unfiltered",
                table_id
            );
            files = self
                .download_periods(table_id, territories, variables, &Classifications::new())
                .await?;
        } else {
            let combinations = unnest(&metadata);
            info!(
                "Table {}: {} classification combinations",
                table_id,
                combinations.total()
            );
            for classifications in combinations {
                let downloaded = self
                    .download_periods(table_id, territories, variables, &classifications)
                    .await?;
                files.extend(downloaded);
            }
        }

        enter(table_id, FetchPhase::Done);
        Ok(files)
    }

    async fn download_periods(
        &self,
        table_id: &str,
        territories: &Territories,
        variables: Option<&[String]>,
        classifications: &Classifications,
    ) -> FetchResult<Vec<DownloadedFile>> {
        let variables = variables
            .map(<[String]>::to_vec)
            .unwrap_or_else(|| vec![crate::constants::sidra::ALL.to_string()]);

        let periods = self.api.list_periods(table_id).await?;
        enter(table_id, FetchPhase::PeriodsEnumerated);
        debug!("Table {}: {} periods", table_id, periods.len());

        self.cache.ensure_table_dir(table_id).await?;

        let mut files = Vec::with_capacity(periods.len());
        for period in periods {
            enter(table_id, FetchPhase::PerPeriodDownloading);

            let request = TableRequest {
                table_id: table_id.to_string(),
                periods: vec![period.id.clone()],
                territories: territories.clone(),
                variables: variables.clone(),
                classifications: classifications.clone(),
                format: self.config.format,
                precision: self.config.precision,
            };
            let path = self.cache.file_path(&request, &period.modification_stamp());

            if self.cache.exists(&path).await {
                warn!("File already exists: {}", path.display());
            } else {
                info!(
                    "Downloading {}",
                    path.file_name().unwrap_or_default().to_string_lossy()
                );
                let body = self.get_table(&request).await?;
                self.cache.save_atomic(&body, &path).await?;
            }

            files.push(DownloadedFile {
                request,
                period,
                path,
            });
        }

        Ok(files)
    }

    /// Retrieve one response, retrying transient failures
    ///
    /// Timeouts and remote protocol errors are logged and retried after
    /// `retry_delay`; any other failure is returned immediately.
    pub async fn get_table(&self, request: &TableRequest) -> FetchResult<Vec<u8>> {
        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            match self.api.fetch_values(request).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() => {
                    error!(
                        "Transient error fetching table {} (attempt {}): {}",
                        request.table_id, attempts, e
                    );
                    if let Some(max_retries) = self.config.max_retries {
                        if attempts > max_retries {
                            return Err(FetchError::RetriesExhausted { attempts, last: e });
                        }
                    }
                    info!("Retrying in {:?}...", self.config.retry_delay);
                    tokio::time::sleep(self.config.retry_delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// End the fetch phase, releasing the client's connection resources
    ///
    /// The client is dropped here, which closes its connection pool.
    pub async fn close(self) {
        let Fetcher { api, .. } = self;
        api.close().await;
        drop(api);
        debug!("Fetcher closed");
    }
}
