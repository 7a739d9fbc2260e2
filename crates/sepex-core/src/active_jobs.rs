//! Concurrent map of currently live jobs, keyed by job id.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::job::JobHandle;
use crate::model::JobId;

/// Tracing target for active-set mutations.
const TRACING_TARGET: &str = "sepex_core::active_jobs";

/// The set of jobs that have been admitted (sync or async, local or remote)
/// and have not yet finished cleanup. Removal is only ever requested from a
/// job's own `Close()` path (via `StatusBus`'s `doneChan` consumer), never
/// directly by a handler.
pub struct ActiveJobs {
    jobs: Mutex<HashMap<JobId, JobHandle>>,
}

impl Default for ActiveJobs {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveJobs {
    pub fn new() -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
        }
    }

    /// Inserts a job. Fails with [`ErrorKind::InternalInvariantViolation`](crate::ErrorKind::InternalInvariantViolation)
    /// if the id is already present — the dispatcher is required to generate
    /// unique ids, so a collision here means something upstream is broken.
    pub fn add(&self, job: JobHandle) -> Result<()> {
        let mut jobs = self.jobs.lock().expect("active jobs lock poisoned");
        if jobs.contains_key(&job.id()) {
            tracing::error!(target: TRACING_TARGET, job_id = %job.id(), "duplicate job id inserted into active set");
            return Err(Error::invariant(format!(
                "job id {} already present in active jobs",
                job.id()
            )));
        }
        tracing::debug!(target: TRACING_TARGET, job_id = %job.id(), "added to active jobs");
        jobs.insert(job.id(), job);
        Ok(())
    }

    pub fn get(&self, job_id: JobId) -> Option<JobHandle> {
        let jobs = self.jobs.lock().expect("active jobs lock poisoned");
        jobs.get(&job_id).cloned()
    }

    /// Removes a job by id. Called exclusively from the `doneChan` consumer
    /// once a job's cleanup has completed.
    pub fn remove(&self, job_id: JobId) -> Option<JobHandle> {
        let mut jobs = self.jobs.lock().expect("active jobs lock poisoned");
        let removed = jobs.remove(&job_id);
        if removed.is_some() {
            tracing::debug!(target: TRACING_TARGET, job_id = %job_id, "removed from active jobs");
        }
        removed
    }

    pub fn len(&self) -> usize {
        let jobs = self.jobs.lock().expect("active jobs lock poisoned");
        jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A point-in-time copy of every currently active job, used by graceful
    /// shutdown to `Kill` every non-terminal job.
    pub fn snapshot(&self) -> Vec<JobHandle> {
        let jobs = self.jobs.lock().expect("active jobs lock poisoned");
        jobs.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::test_support::dummy_job_handle;

    #[test]
    fn add_then_get_round_trips() {
        let active = ActiveJobs::new();
        let job = dummy_job_handle();
        active.add(job.clone()).unwrap();
        assert_eq!(active.get(job.id()).unwrap().id(), job.id());
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let active = ActiveJobs::new();
        let job = dummy_job_handle();
        active.add(job.clone()).unwrap();
        let err = active.add(job).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InternalInvariantViolation);
    }

    #[test]
    fn remove_drops_from_the_map() {
        let active = ActiveJobs::new();
        let job = dummy_job_handle();
        active.add(job.clone()).unwrap();
        assert!(active.remove(job.id()).is_some());
        assert!(active.get(job.id()).is_none());
    }
}
