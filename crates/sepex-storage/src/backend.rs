//! [`OpendalBlobStore`]: an OpenDAL-backed [`BlobStore`] implementation.
//!
//! Persists job logs, JSON-LD metadata, and results per §6's object keys
//! (`<metadata-prefix>/<jobId>.json`, `<results-prefix>/<jobId>...`).
//! Out of scope for `sepex-core` per §1 ("Object storage upload of
//! logs/metadata/results"); this crate only supplies an implementation.

use async_trait::async_trait;
use opendal::{Operator, services};
use sepex_core::error::Result as CoreResult;
use sepex_core::traits::BlobStore;

use crate::TRACING_TARGET;
use crate::azblob::AzureBlobConfig;
use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::fs::FsConfig;
use crate::s3::S3Config;

/// Wraps a single OpenDAL [`Operator`] and implements `sepex-core`'s
/// [`BlobStore`] trait against it.
#[derive(Clone)]
pub struct OpendalBlobStore {
    operator: Operator,
    backend_name: &'static str,
}

impl OpendalBlobStore {
    /// Builds a store from configuration, constructing the matching
    /// OpenDAL operator.
    pub fn new(config: &StorageConfig) -> Result<Self, StorageError> {
        let operator = Self::create_operator(config)?;
        tracing::info!(
            target: TRACING_TARGET,
            backend = config.backend_name(),
            "blob store initialized"
        );
        Ok(Self {
            operator,
            backend_name: config.backend_name(),
        })
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend_name
    }

    fn create_operator(config: &StorageConfig) -> Result<Operator, StorageError> {
        match config {
            StorageConfig::S3(cfg) => Self::create_s3_operator(cfg),
            StorageConfig::AzureBlob(cfg) => Self::create_azblob_operator(cfg),
            StorageConfig::Fs(cfg) => Self::create_fs_operator(cfg),
        }
    }

    fn create_s3_operator(cfg: &S3Config) -> Result<Operator, StorageError> {
        let mut builder = services::S3::default().bucket(&cfg.bucket).region(&cfg.region);

        if let Some(ref endpoint) = cfg.endpoint {
            builder = builder.endpoint(endpoint);
        }
        if let Some(ref access_key_id) = cfg.access_key_id {
            builder = builder.access_key_id(access_key_id);
        }
        if let Some(ref secret_access_key) = cfg.secret_access_key {
            builder = builder.secret_access_key(secret_access_key);
        }
        if let Some(ref prefix) = cfg.prefix {
            builder = builder.root(prefix);
        }

        Ok(Operator::new(builder)?.finish())
    }

    fn create_azblob_operator(cfg: &AzureBlobConfig) -> Result<Operator, StorageError> {
        let mut builder = services::Azblob::default()
            .container(&cfg.container)
            .account_name(&cfg.account_name);

        if let Some(ref account_key) = cfg.account_key {
            builder = builder.account_key(account_key);
        }
        if let Some(ref prefix) = cfg.prefix {
            builder = builder.root(prefix);
        }

        Ok(Operator::new(builder)?.finish())
    }

    fn create_fs_operator(cfg: &FsConfig) -> Result<Operator, StorageError> {
        let builder = services::Fs::default().root(&cfg.root);
        Ok(Operator::new(builder)?.finish())
    }
}

#[async_trait]
impl BlobStore for OpendalBlobStore {
    async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> CoreResult<()> {
        tracing::debug!(
            target: TRACING_TARGET,
            key,
            content_type,
            size = bytes.len(),
            "uploading blob"
        );
        self.operator
            .write(key, bytes)
            .await
            .map_err(StorageError::from)
            .map_err(sepex_core::error::Error::from)?;
        Ok(())
    }

    async fn get(&self, key: &str) -> CoreResult<Vec<u8>> {
        let data = self
            .operator
            .read(key)
            .await
            .map_err(StorageError::from)
            .map_err(sepex_core::error::Error::from)?;
        Ok(data.to_vec())
    }
}

/// Maps a storage-layer failure onto `sepex-core`'s `Auxiliary` error kind,
/// per §7: upload/write failures here are logged and never alter a job's
/// terminal status.
impl From<StorageError> for sepex_core::error::Error {
    fn from(err: StorageError) -> Self {
        sepex_core::error::Error::auxiliary(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fs_store(root: &std::path::Path) -> OpendalBlobStore {
        let config = StorageConfig::Fs(FsConfig::new(root.to_string_lossy().into_owned()));
        OpendalBlobStore::new(&config).expect("fs operator should build")
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = fs_store(dir.path());

        store
            .put("metadata/job-1.json", "application/json", b"{\"ok\":true}".to_vec())
            .await
            .unwrap();

        let bytes = store.get("metadata/job-1.json").await.unwrap();
        assert_eq!(bytes, b"{\"ok\":true}");
    }

    #[tokio::test]
    async fn get_missing_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = fs_store(dir.path());

        let err = store.get("metadata/missing.json").await.unwrap_err();
        assert_eq!(err.kind(), sepex_core::error::ErrorKind::Auxiliary);
    }

    #[test]
    fn backend_name_reflects_config() {
        let dir = tempfile::tempdir().unwrap();
        let store = fs_store(dir.path());
        assert_eq!(store.backend_name(), "fs");
    }
}
