//! Prelude module for convenient imports.

pub use crate::backend::OpendalBlobStore;
pub use crate::config::StorageConfig;
pub use crate::error::{StorageError, StorageResult};
