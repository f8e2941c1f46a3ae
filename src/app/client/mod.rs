//! HTTP client for the IBGE SIDRA APIs
//!
//! This module provides the metadata/retrieval collaborator the fetcher
//! owns. [`SidraApi`] is the seam: the fetcher only sees parsed periods and
//! classifications plus raw response bodies, never HTTP details.
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: rate-limited requests and failure classification
//! - `urls`: values and metadata URL grammar

use async_trait::async_trait;
use serde::Deserialize;

use crate::app::models::{ClassificationMetadata, Period, TableRequest};
use crate::errors::ClientResult;

pub mod config;
pub mod http;
pub mod urls;

pub use config::ClientConfig;

use http::HttpHandler;

/// Metadata and retrieval operations the fetcher depends on
#[async_trait]
pub trait SidraApi: Send + Sync {
    /// Ordered periods of a table with their modification dates
    async fn list_periods(&self, table_id: &str) -> ClientResult<Vec<Period>>;

    /// Classifications of a table, categories in API order
    async fn get_classifications(&self, table_id: &str)
        -> ClientResult<Vec<ClassificationMetadata>>;

    /// Raw response body for one request
    async fn fetch_values(&self, request: &TableRequest) -> ClientResult<Vec<u8>>;

    /// Called once when the fetch phase ends, just before the client is dropped
    ///
    /// Connection resources are released by the drop that follows; this hook
    /// is for work that has to happen before it.
    async fn close(&self) {}
}

#[derive(Debug, Deserialize)]
struct MetadataResponse {
    #[serde(default, rename = "classificacoes")]
    classifications: Vec<ClassificationMetadata>,
}

/// reqwest-backed [`SidraApi`]
#[derive(Debug)]
pub struct SidraClient {
    http_handler: HttpHandler,
    config: ClientConfig,
}

impl SidraClient {
    /// Creates a client with default configuration
    pub fn new() -> ClientResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a client with custom configuration
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the HTTP client or rate limiter cannot be built
    pub fn with_config(config: ClientConfig) -> ClientResult<Self> {
        let client = config.build_http_client()?;
        let http_handler = HttpHandler::new(client, config.rate_limit_rps)?;

        tracing::info!("Created SIDRA client for {}", config.values_base_url);

        Ok(Self {
            http_handler,
            config,
        })
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl SidraApi for SidraClient {
    async fn list_periods(&self, table_id: &str) -> ClientResult<Vec<Period>> {
        let url = urls::periods_url(&self.config.metadata_base_url, table_id)?;
        tracing::debug!("Listing periods: {}", url);
        self.http_handler.get_json(&url).await
    }

    async fn get_classifications(
        &self,
        table_id: &str,
    ) -> ClientResult<Vec<ClassificationMetadata>> {
        let url = urls::metadata_url(&self.config.metadata_base_url, table_id)?;
        tracing::debug!("Fetching metadata: {}", url);
        let metadata: MetadataResponse = self.http_handler.get_json(&url).await?;
        Ok(metadata.classifications)
    }

    async fn fetch_values(&self, request: &TableRequest) -> ClientResult<Vec<u8>> {
        let url = urls::values_url(&self.config.values_base_url, request)?;
        tracing::debug!("Fetching values: {}", url);
        self.http_handler.get_bytes(&url).await
    }

    /// The pooled connections go away with the inner `reqwest::Client` when
    /// the fetcher drops this client
    async fn close(&self) {
        tracing::debug!("Closing SIDRA client");
    }
}
