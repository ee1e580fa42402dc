//! Local file-based plan storage.
//!
//! Relative paths resolve against the store's base directory; absolute paths
//! are used as given.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::document::{DocumentFormat, PLAN_FILE_EXTENSION};
use crate::error::{PlanSyncError, Result, StoreError};

use super::backend::PlanStore;

/// Default plan directory name.
pub const DEFAULT_PLAN_DIR: &str = "plans";

/// Local file-based plan store.
#[derive(Debug, Clone)]
pub struct LocalPlanStore {
    /// Directory relative paths resolve against.
    base_dir: PathBuf,
}

impl LocalPlanStore {
    /// Creates a store rooted at `base_dir`.
    #[must_use]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Creates a store rooted at the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn current_dir() -> Result<Self> {
        let base_dir = std::env::current_dir().map_err(|e| {
            PlanSyncError::internal(format!("Cannot determine current directory: {e}"))
        })?;
        Ok(Self::with_base_dir(base_dir))
    }

    /// The directory relative paths resolve against.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolves a path against the base directory.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

/// Appends the plan extension to a file name that has no dot in it.
#[must_use]
pub fn with_plan_extension(path: &Path) -> PathBuf {
    let has_dot = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.contains('.'));
    if has_dot {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".");
        name.push(PLAN_FILE_EXTENSION);
        PathBuf::from(name)
    }
}

#[async_trait]
impl PlanStore for LocalPlanStore {
    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let full_path = self.resolve(path);
        if !full_path.exists() {
            return Err(StoreError::NotFound { path: full_path }.into());
        }

        info!("Reading plan from: {}", full_path.display());
        let bytes = fs::read(&full_path)
            .await
            .map_err(|e| StoreError::read(&full_path, e.to_string()))?;
        Ok(bytes)
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);
        if let Some(parent) = full_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating plan directory: {}", parent.display());
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::write(parent, e.to_string()))?;
            }
        }

        info!("Writing plan to: {}", full_path.display());

        // Write to a temporary file first, then rename for atomicity
        let temp_path = full_path.with_extension("tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| StoreError::write(&temp_path, e.to_string()))?;
        file.write_all(bytes)
            .await
            .map_err(|e| StoreError::write(&temp_path, e.to_string()))?;
        file.sync_all()
            .await
            .map_err(|e| StoreError::write(&temp_path, e.to_string()))?;

        fs::rename(&temp_path, &full_path)
            .await
            .map_err(|e| StoreError::write(&full_path, format!("rename failed: {e}")))?;

        debug!("Plan written successfully");
        Ok(())
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(self.resolve(path).exists())
    }

    async fn list(&self) -> Result<Vec<PathBuf>> {
        if !self.base_dir.exists() {
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&self.base_dir)
            .await
            .map_err(|e| StoreError::read(&self.base_dir, e.to_string()))?;

        let mut plans = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::read(&self.base_dir, e.to_string()))?
        {
            let path = entry.path();
            if path.is_file() && DocumentFormat::from_path(&path).is_ok() {
                plans.push(path);
            }
        }
        plans.sort();
        Ok(plans)
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}
