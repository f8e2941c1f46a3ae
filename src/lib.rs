//! SIDRA ETL Library
//!
//! Downloads IBGE SIDRA statistics tables into a deterministic file cache
//! and loads them into PostgreSQL. Downloads are idempotent: a response
//! already cached for the same request and period modification date is
//! never fetched again.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
