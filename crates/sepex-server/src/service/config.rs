//! Composable configuration for the SEPEX service state.
//!
//! Mirrors the donor's per-concern `*Config` structs (one per collaborator,
//! each independently clap-derivable behind the `config` feature) rather
//! than one monolithic struct, so a caller embedding `sepex-server` in a
//! different CLI can flatten only the pieces it needs.

use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use sepex_core::model::ResourceLimits;
use serde::{Deserialize, Serialize};

/// CPU/memory ceiling for locally scheduled (container/subprocess) jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct ResourceConfig {
    /// Host-wide CPU ceiling. Defaults to 0.8 x the host's logical CPU count.
    #[cfg_attr(feature = "config", arg(long, env = "MAX_LOCAL_CPUS"))]
    pub max_local_cpus: Option<f64>,

    /// Host-wide memory ceiling, in megabytes.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "MAX_LOCAL_MEMORY", default_value = "8192")
    )]
    pub max_local_memory: u64,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            max_local_cpus: None,
            max_local_memory: 8192,
        }
    }
}

impl ResourceConfig {
    /// Resolves the configured ceiling into [`ResourceLimits`], falling back
    /// to 0.8 x the detected host CPU count when unset.
    pub fn resource_limits(&self) -> ResourceLimits {
        let max_cpus = self.max_local_cpus.unwrap_or_else(|| {
            let host_cpus = std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1);
            ResourceLimits::default_max_cpus(host_cpus)
        });
        ResourceLimits::new(max_cpus, self.max_local_memory)
    }
}

/// Local filesystem paths the scheduler reads process specs from and writes
/// job logs to, plus the object-storage key prefixes completed jobs are
/// uploaded under.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct PathsConfig {
    /// Directory job process/server JSONL logs are written to while running.
    #[cfg_attr(feature = "config", arg(long, env = "TMP_JOB_LOGS_DIR"))]
    pub tmp_job_logs_dir: PathBuf,

    /// Directory containing one YAML file per registered process spec.
    #[cfg_attr(feature = "config", arg(long, env = "PLUGINS_DIR"))]
    pub plugins_dir: PathBuf,

    /// Object-storage key prefix job metadata is uploaded under.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "STORAGE_METADATA_PREFIX", default_value = "metadata")
    )]
    pub storage_metadata_prefix: String,

    /// Object-storage key prefix job results are uploaded under.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "STORAGE_RESULTS_PREFIX", default_value = "results")
    )]
    pub storage_results_prefix: String,

    /// How long a completed job's local log files are retained on disk
    /// after upload, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "LOG_RETENTION_SECONDS", default_value = "3600")
    )]
    pub log_retention_seconds: u64,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            tmp_job_logs_dir: std::env::temp_dir().join("sepex-jobs"),
            plugins_dir: PathBuf::from("./plugins"),
            storage_metadata_prefix: "metadata".to_owned(),
            storage_results_prefix: "results".to_owned(),
            log_retention_seconds: 3600,
        }
    }
}

impl PathsConfig {
    pub fn log_retention(&self) -> Duration {
        Duration::from_secs(self.log_retention_seconds)
    }
}

/// Identity metadata surfaced in OpenAPI docs and JSON-LD metadata objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct IdentityConfig {
    /// Base repository URL, used to build the `@context` of JSON-LD job
    /// metadata (`<repoURL>/blob/main/context.jsonld`).
    #[cfg_attr(
        feature = "config",
        arg(
            long,
            env = "REPO_URL",
            default_value = "https://github.com/sepex-project/sepex"
        )
    )]
    pub repo_url: String,

    /// Deployment name surfaced in OpenAPI docs and health responses.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "API_NAME", default_value = "SEPEX")
    )]
    pub api_name: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            repo_url: "https://github.com/sepex-project/sepex".to_owned(),
            api_name: "SEPEX".to_owned(),
        }
    }
}

impl IdentityConfig {
    /// The `@context` URL embedded in every job's JSON-LD metadata object.
    pub fn context_url(&self) -> String {
        format!("{}/blob/main/context.jsonld", self.repo_url.trim_end_matches('/'))
    }
}

/// Backend selection and credentials for the object store completed jobs
/// are uploaded to. Defaults to the local filesystem, which needs no
/// credentials and is sufficient for a single-node deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct StorageConfig {
    #[cfg_attr(
        feature = "config",
        arg(long, env = "STORAGE_BACKEND", default_value = "fs")
    )]
    pub backend: StorageBackendKind,

    /// Root directory for the `fs` backend.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "STORAGE_FS_ROOT", default_value = "./data/blobs")
    )]
    pub fs_root: String,

    /// Bucket name for the `s3` backend.
    #[cfg_attr(feature = "config", arg(long, env = "STORAGE_S3_BUCKET"))]
    pub s3_bucket: Option<String>,
    #[cfg_attr(
        feature = "config",
        arg(long, env = "STORAGE_S3_REGION", default_value = "us-east-1")
    )]
    pub s3_region: String,
    #[cfg_attr(feature = "config", arg(long, env = "STORAGE_S3_ENDPOINT"))]
    pub s3_endpoint: Option<String>,
    #[cfg_attr(feature = "config", arg(long, env = "STORAGE_S3_ACCESS_KEY_ID"))]
    pub s3_access_key_id: Option<String>,
    #[cfg_attr(feature = "config", arg(long, env = "STORAGE_S3_SECRET_ACCESS_KEY"))]
    pub s3_secret_access_key: Option<String>,

    /// Container name for the `azblob` backend.
    #[cfg_attr(feature = "config", arg(long, env = "STORAGE_AZURE_CONTAINER"))]
    pub azure_container: Option<String>,
    #[cfg_attr(feature = "config", arg(long, env = "STORAGE_AZURE_ACCOUNT_NAME"))]
    pub azure_account_name: Option<String>,
    #[cfg_attr(feature = "config", arg(long, env = "STORAGE_AZURE_ACCOUNT_KEY"))]
    pub azure_account_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum StorageBackendKind {
    Fs,
    S3,
    AzureBlob,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::Fs,
            fs_root: "./data/blobs".to_owned(),
            s3_bucket: None,
            s3_region: "us-east-1".to_owned(),
            s3_endpoint: None,
            s3_access_key_id: None,
            s3_secret_access_key: None,
            azure_container: None,
            azure_account_name: None,
            azure_account_key: None,
        }
    }
}

impl StorageConfig {
    /// Builds the `sepex-storage` configuration matching the selected
    /// backend, with the metadata/results prefixes threaded in separately
    /// by the caller (they gate object keys, not the backend itself).
    pub fn to_opendal_config(&self) -> anyhow::Result<sepex_storage::StorageConfig> {
        match self.backend {
            StorageBackendKind::Fs => Ok(sepex_storage::StorageConfig::Fs(
                sepex_storage::FsConfig::new(self.fs_root.clone()),
            )),
            StorageBackendKind::S3 => {
                let bucket = self
                    .s3_bucket
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("STORAGE_S3_BUCKET is required for the s3 storage backend"))?;
                let mut s3 = sepex_storage::S3Config::new(bucket, self.s3_region.clone());
                if let Some(endpoint) = &self.s3_endpoint {
                    s3 = s3.with_endpoint(endpoint.clone());
                }
                if let (Some(key_id), Some(secret)) =
                    (&self.s3_access_key_id, &self.s3_secret_access_key)
                {
                    s3 = s3.with_credentials(key_id.clone(), secret.clone());
                }
                Ok(sepex_storage::StorageConfig::S3(s3))
            }
            StorageBackendKind::AzureBlob => {
                let container = self.azure_container.clone().ok_or_else(|| {
                    anyhow::anyhow!("STORAGE_AZURE_CONTAINER is required for the azblob storage backend")
                })?;
                let account_name = self.azure_account_name.clone().ok_or_else(|| {
                    anyhow::anyhow!("STORAGE_AZURE_ACCOUNT_NAME is required for the azblob storage backend")
                })?;
                let mut azure = sepex_storage::AzureBlobConfig::new(container, account_name);
                if let Some(key) = &self.azure_account_key {
                    azure = azure.with_account_key(key.clone());
                }
                Ok(sepex_storage::StorageConfig::AzureBlob(azure))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_config_defaults_to_host_cpu_fraction() {
        let config = ResourceConfig::default();
        let limits = config.resource_limits();
        assert!(limits.max_cpus > 0.0);
        assert_eq!(limits.max_memory_mb, 8192);
    }

    #[test]
    fn explicit_cpu_ceiling_is_respected() {
        let config = ResourceConfig {
            max_local_cpus: Some(2.5),
            max_local_memory: 4096,
        };
        let limits = config.resource_limits();
        assert_eq!(limits.max_cpus, 2.5);
    }

    #[test]
    fn context_url_is_derived_from_repo_url() {
        let config = IdentityConfig {
            repo_url: "https://github.com/example/sepex".to_owned(),
            api_name: "SEPEX".to_owned(),
        };
        assert_eq!(
            config.context_url(),
            "https://github.com/example/sepex/blob/main/context.jsonld"
        );
    }

    #[test]
    fn fs_backend_builds_without_credentials() {
        let config = StorageConfig::default();
        assert!(config.to_opendal_config().is_ok());
    }

    #[test]
    fn s3_backend_requires_bucket() {
        let config = StorageConfig {
            backend: StorageBackendKind::S3,
            ..StorageConfig::default()
        };
        assert!(config.to_opendal_config().is_err());
    }
}
