//! Prelude module for SIDRA ETL Library
//!
//! Re-exports the items needed to write a custom [`TablePipeline`] with a
//! single `use sidra_etl::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use sidra_etl::prelude::*;
//!
//! struct Populacao;
//!
//! #[async_trait]
//! impl TablePipeline for Populacao {
//!     async fn list_requests(&self, _fetcher: &Fetcher) -> Result<Vec<TableQuery>> {
//!         let mut territories = Territories::new();
//!         territories.insert("6".to_string(), Vec::new());
//!         Ok(vec![TableQuery::new("6579", territories)])
//!     }
//!
//!     fn destination(&self) -> TableSpec {
//!         TableSpec::new("ibge", "estimativa_populacao")
//!             .column("id_municipio", "INTEGER NOT NULL")
//!             .column("populacao", "BIGINT")
//!             .primary_key(["id_municipio"])
//!     }
//!
//!     fn refine(&self, table: RawTable) -> TableResult<RowSet> {
//!         let id = table.require_column("D1C")?;
//!         let value = table.require_column("V")?;
//!         let mut rows = RowSet::new([
//!             ("id_municipio", ColumnKind::Integer),
//!             ("populacao", ColumnKind::Integer),
//!         ]);
//!         for row in 0..table.len() {
//!             if let (Some(id), Some(value)) = (table.value(row, id), table.value(row, value)) {
//!                 rows.push(vec![Value::Integer(id.parse().unwrap_or_default()), Value::Integer(value.parse().unwrap_or_default())]);
//!             }
//!         }
//!         Ok(rows)
//!     }
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result, StoreResult, TableResult};

// Pipeline building blocks
pub use crate::app::{
    run_pipeline, CacheConfig, CacheManager, ClassificationFilter, Classifications, ColumnKind,
    ConflictPolicy, FetchConfig, Fetcher, LoadOptions, MemoryStore, PgConnector, RawTable, RowSet,
    RunSummary, SidraApi, SidraClient, StoreConnector, TablePipeline, TableQuery, TableSpec,
    TableStore, Territories, Value,
};
pub use crate::config::AppConfig;

pub use async_trait::async_trait;
