//! Deterministic response cache
//!
//! Every response from the values API is stored as one file whose name
//! encodes the complete request and the modification date of its period.
//! A file that exists is a cache hit; there is no separate index.
//!
//! # Module Organization
//!
//! - [`config`] - Configuration types and defaults
//! - [`path`] - Filename codec and directory layout
//! - [`manager`] - Existence checks, atomic writes and listings
//!
//! # Examples
//!
//! ```rust,no_run
//! use sidra_etl::app::cache::{CacheConfig, CacheManager};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = CacheManager::new(CacheConfig::with_data_dir("data/raw/ibge-tabelas")).await?;
//! for path in cache.list_table_files("1612").await? {
//!     println!("{}", path.display());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod manager;
pub mod path;

pub use config::CacheConfig;
pub use manager::CacheManager;
pub use path::PathGenerator;
