//! Cache configuration types and defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::files;

/// Configuration for the response cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root directory; one `t-{table_id}` subdirectory per table
    pub data_dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(files::DEFAULT_DATA_DIR),
        }
    }
}

impl CacheConfig {
    /// Create a new cache configuration with a custom root
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.data_dir, PathBuf::from("data/raw/ibge-tabelas"));
    }

    #[test]
    fn test_custom_root() {
        let config = CacheConfig::with_data_dir("/tmp/sidra");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/sidra"));
    }
}
