//! In-memory mock of [`JobStore`] with put-call recording, for tests that
//! need to assert on persistence calls rather than just their outcome.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sepex_core::error::Result;
use sepex_core::model::{JobId, JobRecord};
use sepex_core::traits::JobStore;

/// Records every [`JobRecord`] ever put, in order, alongside the latest
/// record per job id.
#[derive(Default)]
pub struct MockJobStore {
    records: Mutex<HashMap<JobId, JobRecord>>,
    put_count: Mutex<usize>,
}

impl MockJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `put` calls observed so far.
    pub fn put_count(&self) -> usize {
        *self.put_count.lock().unwrap()
    }
}

#[async_trait]
impl JobStore for MockJobStore {
    async fn put(&self, record: JobRecord) -> Result<()> {
        *self.put_count.lock().unwrap() += 1;
        self.records.lock().unwrap().insert(record.job_id, record);
        Ok(())
    }

    async fn get(&self, job_id: JobId) -> Result<Option<JobRecord>> {
        Ok(self.records.lock().unwrap().get(&job_id).cloned())
    }
}
