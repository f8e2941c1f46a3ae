//! Core application logic for SIDRA ETL
//!
//! This module contains the SIDRA client, the response cache, the fetcher
//! that ties them together, and the pipeline that refines cached responses
//! into a table store.
//!
//! # Examples
//!
//! ```rust,no_run
//! use sidra_etl::app::{CacheConfig, CacheManager, FetchConfig, Fetcher, SidraClient, TableQuery, Territories};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = CacheManager::new(CacheConfig::default()).await?;
//! let client = SidraClient::new()?;
//! let fetcher = Fetcher::new(Box::new(client), cache, FetchConfig::default());
//!
//! let mut territories = Territories::new();
//! territories.insert("6".to_string(), Vec::new());
//! let query = TableQuery::new("1612", territories).unnested();
//!
//! let files = fetcher.download(&query).await?;
//! fetcher.close().await;
//! for file in files {
//!     println!("{}", file);
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod classifications;
pub mod client;
pub mod fetcher;
pub mod job;
pub mod models;
pub mod pipeline;
pub mod store;
pub mod table;

// Re-export main public API
pub use cache::{CacheConfig, CacheManager};
pub use classifications::{unnest, Combinations};
pub use client::{ClientConfig, SidraApi, SidraClient};
pub use fetcher::{FetchConfig, FetchPhase, Fetcher};
pub use job::JobPipeline;
pub use models::{
    ClassificationFilter, ClassificationMetadata, Classifications, DownloadedFile, Format, Period,
    Precision, TableQuery, TableRequest, Territories,
};
pub use pipeline::{run_pipeline, LoadOptions, RunSummary, TablePipeline};
pub use store::{
    ColumnKind, ConflictPolicy, DatabaseConfig, MemoryStore, PgConnector, RowSet, StoreConnector,
    TableSpec, TableStore, Value,
};
pub use table::RawTable;
