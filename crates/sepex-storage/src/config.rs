//! Storage configuration types.

use serde::{Deserialize, Serialize};

pub use crate::azblob::AzureBlobConfig;
pub use crate::fs::FsConfig;
pub use crate::s3::S3Config;

/// Storage backend configuration for the
/// [`OpendalBlobStore`](crate::OpendalBlobStore) implementation that
/// persists job logs, JSON-LD metadata, and results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum StorageConfig {
    /// Amazon S3 (or an S3-compatible endpoint, e.g. MinIO).
    S3(S3Config),
    /// Azure Blob Storage.
    AzureBlob(AzureBlobConfig),
    /// Local filesystem, for single-node deployments without an object store.
    Fs(FsConfig),
}

impl StorageConfig {
    /// Returns the backend name as a static string, used in startup logs.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::S3(_) => "s3",
            Self::AzureBlob(_) => "azblob",
            Self::Fs(_) => "fs",
        }
    }
}
