//! Fetcher configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::app::models::{Format, Precision};
use crate::constants::limits;

/// Configuration for table downloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Fixed delay before retrying a transient failure
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
    /// Maximum retries of a transient failure; `None` retries forever
    pub max_retries: Option<u32>,
    /// Response descriptor format
    pub format: Format,
    /// Decimal precision of values
    pub precision: Precision,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            retry_delay: limits::RETRY_DELAY,
            max_retries: None,
            format: Format::Codes,
            precision: Precision::Maximum,
        }
    }
}

impl FetchConfig {
    /// Set the retry delay
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Bound the number of retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FetchConfig::default();
        assert_eq!(config.retry_delay, Duration::from_secs(5));
        assert_eq!(config.max_retries, None);
        assert_eq!(config.format, Format::Codes);
        assert_eq!(config.precision, Precision::Maximum);
    }

    #[test]
    fn test_config_from_toml() {
        let config: FetchConfig = toml::from_str(
            r#"
retry_delay = "500ms"
max_retries = 10
format = "A"
precision = "s"
"#,
        )
        .unwrap();
        assert_eq!(config.retry_delay, Duration::from_millis(500));
        assert_eq!(config.max_retries, Some(10));
        assert_eq!(config.format, Format::CodesAndNames);
        assert_eq!(config.precision, Precision::Standard);
    }
}
