//! Application constants for SIDRA ETL
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain.

use std::time::Duration;

/// Environment variable names
pub mod env {
    /// Overrides `[cache] data_dir`
    pub const DATA_DIR: &str = "SIDRA_DATA_DIR";

    /// Overrides `[database] password`
    pub const DB_PASSWORD: &str = "SIDRA_DB_PASSWORD";

    /// Overrides `[database] host`
    pub const DB_HOST: &str = "SIDRA_DB_HOST";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "sidra-etl/0.1.0 (IBGE statistics loader)";

    /// Default request timeout; large municipal tables take minutes to render
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
}

/// Rate limiting and retry configuration
pub mod limits {
    use super::Duration;

    /// Default rate limit for SIDRA requests (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 2;

    /// Fixed delay between retries of a transient failure
    pub const RETRY_DELAY: Duration = Duration::from_secs(5);
}

/// IBGE service URLs
pub mod sidra {
    /// SIDRA values API
    pub const VALUES_BASE_URL: &str = "https://apisidra.ibge.gov.br/values";

    /// IBGE aggregates metadata API
    pub const METADATA_BASE_URL: &str = "https://servicodados.ibge.gov.br/api/v3/agregados";

    /// Sentinel for "every variable" / "every territory"
    pub const ALL: &str = "all";

    /// Category id for the aggregate total of a classification
    pub const TOTAL_CATEGORY_ID: &str = "0";
}

/// File operation constants
pub mod files {
    /// Temporary file suffix for atomic operations
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Extension of persisted responses
    pub const RESPONSE_EXTENSION: &str = "json";

    /// Default cache root, relative to the working directory
    pub const DEFAULT_DATA_DIR: &str = "data/raw/ibge-tabelas";

    /// Values SIDRA uses for unavailable or suppressed cells
    pub const MISSING_VALUE_MARKERS: &[&str] = &["...", "-"];
}

/// Table store constants
pub mod store {
    /// Rows per INSERT statement
    pub const DEFAULT_BATCH_SIZE: usize = 1_000;

    /// PostgreSQL bind parameter limit per statement
    pub const MAX_BIND_PARAMS: usize = 65_535;

    /// Default destination schema
    pub const DEFAULT_SCHEMA: &str = "public";

    /// Default pool size; the loader only ever uses one connection at a time
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 2;
}

/// Logging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}

pub use http::USER_AGENT;
pub use limits::{DEFAULT_RATE_LIMIT_RPS, RETRY_DELAY};
pub use sidra::{METADATA_BASE_URL, VALUES_BASE_URL};
