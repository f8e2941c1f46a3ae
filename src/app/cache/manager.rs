//! Cache manager with atomic writes
//!
//! File existence is the only idempotence signal: a response is written to
//! a temporary sibling and renamed into place, so a cache path that exists
//! always holds a complete response.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, error, info};

use crate::app::models::TableRequest;
use crate::errors::{CacheError, CacheResult};

use super::config::CacheConfig;
use super::path::PathGenerator;

/// Response cache rooted at a data directory
#[derive(Debug, Clone)]
pub struct CacheManager {
    config: CacheConfig,
}

impl CacheManager {
    /// Create a cache manager, creating the root directory if needed
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the root directory cannot be created
    pub async fn new(config: CacheConfig) -> CacheResult<Self> {
        Self::ensure_directory_exists(&config.data_dir).await?;
        info!(
            "Initialized cache manager with root: {}",
            config.data_dir.display()
        );
        Ok(Self { config })
    }

    /// Get the cache root directory
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the cache configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    async fn ensure_directory_exists(path: &Path) -> CacheResult<()> {
        if !path.exists() {
            fs::create_dir_all(path).await.map_err(|e| {
                error!("Failed to create cache directory: {}", e);
                CacheError::DirectoryNotAccessible {
                    path: path.to_path_buf(),
                }
            })?;
            debug!("Created cache directory: {}", path.display());
        }
        Ok(())
    }

    /// Cache path for a request as of a modification date
    pub fn file_path(&self, request: &TableRequest, modification: &str) -> PathBuf {
        PathGenerator::file_path(&self.config.data_dir, request, modification)
    }

    /// Directory of a table, created on demand
    pub async fn ensure_table_dir(&self, table_id: &str) -> CacheResult<PathBuf> {
        let dir = PathGenerator::table_dir(&self.config.data_dir, table_id);
        Self::ensure_directory_exists(&dir).await?;
        Ok(dir)
    }

    /// Whether a complete response is cached at `path`
    pub async fn exists(&self, path: &Path) -> bool {
        fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Save content atomically using temp file + rename pattern
    ///
    /// # Errors
    ///
    /// Returns `CacheError` if the write or the rename fails; the temporary
    /// file is removed in both cases.
    pub async fn save_atomic(&self, content: &[u8], final_path: &Path) -> CacheResult<()> {
        if let Some(parent) = final_path.parent() {
            Self::ensure_directory_exists(parent).await?;
        }

        let temp_path = PathGenerator::temp_path(final_path);
        if let Err(e) = fs::write(&temp_path, content).await {
            error!("Failed to write temporary file: {}", e);
            let _ = fs::remove_file(&temp_path).await;
            return Err(CacheError::Io(e));
        }

        if let Err(e) = fs::rename(&temp_path, final_path).await {
            error!("Failed to rename temporary file: {}", e);
            let _ = fs::remove_file(&temp_path).await;
            return Err(CacheError::AtomicOperationFailed {
                temp_path,
                final_path: final_path.to_path_buf(),
            });
        }

        info!("Writing file {}", final_path.display());
        Ok(())
    }

    /// List the complete cached files of a table, sorted by name
    pub async fn list_table_files(&self, table_id: &str) -> CacheResult<Vec<PathBuf>> {
        let dir = PathGenerator::table_dir(&self.config.data_dir, table_id);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && !PathGenerator::is_temp_path(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}
