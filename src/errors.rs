//! Error types for SIDRA ETL
//!
//! This module defines error types for all components of the application.
//! Transient network failures are kept apart from everything else so the
//! fetcher can retry them, and uniqueness violations are kept apart from
//! other database failures so the loader can skip them.

use std::path::PathBuf;
use thiserror::Error;

/// SIDRA HTTP client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// Read or request timeout
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    /// Connection closed, reset or the body was truncated mid-response
    #[error("Remote protocol error while fetching {url}: {reason}")]
    Protocol { url: String, reason: String },

    /// Any other HTTP client failure
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// Server returned an error status
    #[error("Server error: HTTP {status} for {url}")]
    ServerError { status: u16, url: String },

    /// Invalid URL built from a request
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Response body was not the JSON shape we expected
    #[error("Failed to decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Rate limiter could not be built
    #[error("Rate limit must be non-zero")]
    RateLimit,
}

impl ClientError {
    /// Whether the failure is worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Timeout { .. } | ClientError::Protocol { .. })
    }
}

/// Fetch orchestration errors
#[derive(Error, Debug)]
pub enum FetchError {
    /// Client failure that aborts the download
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Cache failure while persisting a response
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Retry bound reached (only when `max_retries` is configured)
    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: ClientError },
}

/// Cache management errors
#[derive(Error, Debug)]
pub enum CacheError {
    /// Cache directory not found or inaccessible
    #[error("Cache directory not accessible: {path}")]
    DirectoryNotAccessible { path: PathBuf },

    /// I/O error on a cache file
    #[error("Cache I/O error")]
    Io(#[from] std::io::Error),

    /// Atomic file operation failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
    },
}

/// Errors reading a cached table file
#[derive(Error, Debug)]
pub enum TableError {
    /// I/O error reading the file
    #[error("I/O error reading table file")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV parsing error")]
    Csv(#[from] csv::Error),

    /// JSON parsing error
    #[error("JSON parsing error")]
    Json(#[from] serde_json::Error),

    /// File extension is not a known transport format
    #[error("Unsupported table file format: {path}")]
    UnsupportedFormat { path: PathBuf },

    /// File has no header row
    #[error("Table file is empty: {path}")]
    Empty { path: PathBuf },

    /// Column not present in the raw table
    #[error("Missing column: {column}")]
    MissingColumn { column: String },

    /// Value could not be converted to the destination type
    #[error("Invalid value for {column}: {value}. {reason}")]
    InvalidValue {
        column: String,
        value: String,
        reason: String,
    },
}

/// Table store errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// Append violated a primary key or unique constraint
    #[error("Uniqueness violation loading into {table}: {detail}")]
    UniqueViolation { table: String, detail: String },

    /// Any other database error
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    /// Destination table was never created
    #[error("Table not found: {table}")]
    TableNotFound { table: String },

    /// Rows do not match the destination columns
    #[error("Column mismatch for {table}: {reason}")]
    ColumnMismatch { table: String, reason: String },
}

impl StoreError {
    /// Whether this is the expected "rows already loaded" condition
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, StoreError::UniqueViolation { .. })
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// I/O error reading configuration
    #[error("Failed to read configuration file")]
    Io(#[from] std::io::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Job definition errors
#[derive(Error, Debug)]
pub enum JobError {
    /// Job file could not be read
    #[error("Failed to read job file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Job file is not valid TOML for a job
    #[error("Invalid job file format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Job file is structurally valid but semantically wrong
    #[error("Invalid job definition: {reason}")]
    Invalid { reason: String },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Client error
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Fetch error
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Cache error
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Table reading error
    #[error(transparent)]
    Table(#[from] TableError),

    /// Store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Job error
    #[error(transparent)]
    Job(#[from] JobError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Client(e) => e.is_transient(),
            AppError::Fetch(FetchError::Client(e)) => e.is_transient(),
            AppError::Store(e) => e.is_unique_violation(),
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Client(_) => "client",
            AppError::Fetch(_) => "fetch",
            AppError::Cache(_) => "cache",
            AppError::Table(_) => "table",
            AppError::Store(_) => "store",
            AppError::Config(_) => "config",
            AppError::Job(_) => "job",
            AppError::Io(_) => "io",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Client result type alias
pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Fetch result type alias
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Cache result type alias
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Table result type alias
pub type TableResult<T> = std::result::Result<T, TableError>;

/// Store result type alias
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
