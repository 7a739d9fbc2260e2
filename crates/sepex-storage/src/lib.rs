#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod azblob;
mod backend;
mod config;
mod error;
mod fs;
mod s3;

#[doc(hidden)]
pub mod prelude;

pub use azblob::AzureBlobConfig;
pub use backend::OpendalBlobStore;
pub use config::StorageConfig;
pub use error::{StorageError, StorageResult};
pub use fs::FsConfig;
pub use s3::S3Config;

/// Tracing target for storage operations.
pub const TRACING_TARGET: &str = "sepex_storage";
