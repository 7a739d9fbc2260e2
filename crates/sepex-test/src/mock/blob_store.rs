//! In-memory mock of [`BlobStore`].

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sepex_core::error::{Error, Result};
use sepex_core::traits::BlobStore;

/// Holds every uploaded blob in a map, keyed by storage key. `get` on a
/// missing key returns an [`Error::auxiliary`], mirroring
/// [`sepex_storage::OpendalBlobStore`]'s behavior on a storage miss.
#[derive(Default)]
pub struct MockBlobStore {
    blobs: Mutex<HashMap<String, (String, Vec<u8>)>>,
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw bytes previously put under `key`, if any, without
    /// going through the `Result`-returning trait method.
    pub fn peek(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.lock().unwrap().get(key).map(|(_, b)| b.clone())
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<()> {
        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), (content_type.to_string(), bytes));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap()
            .get(key)
            .map(|(_, b)| b.clone())
            .ok_or_else(|| Error::auxiliary(format!("no such key: {key}")))
    }
}
