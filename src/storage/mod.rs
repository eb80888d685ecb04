mod error;
pub mod fs;
#[cfg(test)]
pub mod memory;
pub mod path_builder;
pub mod s3;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::Deserialize;
use std::fmt;
use std::fmt::{Debug, Formatter};
use tracing::info;

pub use error::Error;

/// An object found while listing the storage, with its path relative to the
/// storage root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub path: String,
    pub size: u64,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub enum StorageConfig {
    #[serde(rename = "fs")]
    FS(fs::BackendConfig),
    #[serde(rename = "s3")]
    S3(s3::BackendConfig),
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::FS(fs::BackendConfig::default())
    }
}

impl StorageConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            StorageConfig::FS(_) => "local",
            StorageConfig::S3(_) => "S3",
        }
    }
}

/// Read-only view of the registry storage.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Lazily lists every object below the storage root.
    fn list_paths(&self) -> BoxStream<'_, Result<StoredObject, Error>>;

    async fn read_object(&self, path: &str) -> Result<Vec<u8>, Error>;
}

impl Debug for (dyn StorageBackend + 'static) {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageBackend").finish()
    }
}

pub fn build_storage_backend(config: &StorageConfig) -> Result<Box<dyn StorageBackend>, Error> {
    match config {
        StorageConfig::FS(config) => {
            info!("Using filesystem backend");
            Ok(Box::new(fs::Backend::new(config)?))
        }
        StorageConfig::S3(config) => {
            info!("Using S3 backend");
            Ok(Box::new(s3::Backend::new(config)?))
        }
    }
}
