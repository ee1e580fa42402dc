//! Plan storage trait definition.
//!
//! This module defines the common interface for plan file storage backends.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;

/// Trait for plan storage backends.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Reads a plan file.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Writes a plan file, replacing any existing content.
    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<()>;

    /// Checks if a plan file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Lists the files this store can load, sorted by name.
    async fn list(&self) -> Result<Vec<PathBuf>>;

    /// Gets the backend type name.
    fn backend_type(&self) -> &'static str;
}

#[async_trait]
impl PlanStore for Box<dyn PlanStore> {
    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        (**self).read(path).await
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        (**self).write(path, bytes).await
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        (**self).exists(path).await
    }

    async fn list(&self) -> Result<Vec<PathBuf>> {
        (**self).list().await
    }

    fn backend_type(&self) -> &'static str {
        (**self).backend_type()
    }
}
