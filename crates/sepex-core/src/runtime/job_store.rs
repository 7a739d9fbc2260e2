//! In-memory reference [`JobStore`]. Suitable for a single-node deployment;
//! job records do not survive a process restart (consistent with §5's
//! "queued-but-not-started jobs are lost on shutdown" non-goal, generalized
//! to the whole store).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{JobId, JobRecord};
use crate::traits::JobStore;

/// A `Mutex<HashMap<..>>`-backed [`JobStore`], matching the single-mutex
/// style used by [`ActiveJobs`](crate::active_jobs::ActiveJobs) and
/// [`PendingJobs`](crate::pending_jobs::PendingJobs).
#[derive(Default)]
pub struct InMemoryJobStore {
    records: Mutex<HashMap<JobId, JobRecord>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn put(&self, record: JobRecord) -> Result<()> {
        self.records
            .lock()
            .expect("job store lock poisoned")
            .insert(record.job_id, record);
        Ok(())
    }

    async fn get(&self, job_id: JobId) -> Result<Option<JobRecord>> {
        Ok(self
            .records
            .lock()
            .expect("job store lock poisoned")
            .get(&job_id)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HostType, JobStatus, ResourceRequest};

    fn sample_record(job_id: JobId) -> JobRecord {
        JobRecord {
            job_id,
            process_id: "echo".into(),
            process_version: "1.0.0".into(),
            submitter: None,
            status: JobStatus::Accepted,
            update_time: jiff::Timestamp::now(),
            provider_id: None,
            command: vec!["/bin/echo".into()],
            env_vars: vec![],
            volumes: vec![],
            resources: ResourceRequest::new(0.1, 16),
            is_sync: true,
            started_at: None,
            ended_at: None,
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryJobStore::new();
        let job_id = JobId::generate();
        store.put(sample_record(job_id)).await.unwrap();
        let record = store.get(job_id).await.unwrap().expect("record present");
        assert_eq!(record.job_id, job_id);
        assert_eq!(record.process_id, "echo");
        let _ = HostType::Subprocess;
    }

    #[tokio::test]
    async fn get_returns_none_for_unknown_id() {
        let store = InMemoryJobStore::new();
        assert!(store.get(JobId::generate()).await.unwrap().is_none());
    }
}
