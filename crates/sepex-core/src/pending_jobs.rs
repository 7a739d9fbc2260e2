//! FIFO queue of async local jobs awaiting resources.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::job::JobHandle;
use crate::model::JobId;

/// Tracing target for pending-queue mutations.
const TRACING_TARGET: &str = "sepex_core::pending_jobs";

/// An ordered sequence of jobs waiting for `ResourcePool` capacity.
///
/// Membership is a set: the same job id never appears twice (the
/// [`Dispatcher`](crate::dispatcher::Dispatcher) is responsible for that).
/// `remove` preserves the relative order of the remaining entries, which is
/// what lets `Scheduler::drain` retry the new head after a losing race with
/// `Dismiss`.
pub struct PendingJobs {
    queue: Mutex<VecDeque<JobHandle>>,
}

impl Default for PendingJobs {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingJobs {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Appends a job to the tail of the queue.
    pub fn append(&self, job: JobHandle) {
        let mut queue = self.queue.lock().expect("pending jobs lock poisoned");
        tracing::debug!(target: TRACING_TARGET, job_id = %job.id(), "appended to pending queue");
        queue.push_back(job);
    }

    /// Returns a clone of the head of the queue without removing it.
    pub fn peek(&self) -> Option<JobHandle> {
        let queue = self.queue.lock().expect("pending jobs lock poisoned");
        queue.front().cloned()
    }

    /// Removes a job by id, preserving the order of the remaining entries.
    /// Returns `None` if the job was already removed (e.g. by a concurrent
    /// `Dismiss`) — callers must treat this as a race, not an error.
    pub fn remove(&self, job_id: JobId) -> Option<JobHandle> {
        let mut queue = self.queue.lock().expect("pending jobs lock poisoned");
        let index = queue.iter().position(|j| j.id() == job_id)?;
        let removed = queue.remove(index);
        tracing::debug!(target: TRACING_TARGET, job_id = %job_id, "removed from pending queue");
        removed
    }

    /// Current queue depth, exposed verbatim at `/admin/resources`.
    pub fn len(&self) -> usize {
        let queue = self.queue.lock().expect("pending jobs lock poisoned");
        queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A point-in-time copy of every currently pending job, used by shutdown
    /// to discard the whole queue.
    pub fn snapshot(&self) -> Vec<JobHandle> {
        let queue = self.queue.lock().expect("pending jobs lock poisoned");
        queue.iter().cloned().collect()
    }

    /// Drops every pending job unconditionally. Used only by shutdown: queued
    /// but not yet started jobs are lost per the persistence non-goal.
    pub fn clear(&self) -> Vec<JobHandle> {
        let mut queue = self.queue.lock().expect("pending jobs lock poisoned");
        queue.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::test_support::dummy_job_handle;

    #[test]
    fn append_and_peek_preserve_fifo_order() {
        let pending = PendingJobs::new();
        let a = dummy_job_handle();
        let b = dummy_job_handle();
        pending.append(a.clone());
        pending.append(b.clone());
        assert_eq!(pending.peek().unwrap().id(), a.id());
        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn remove_preserves_order_of_remaining_entries() {
        let pending = PendingJobs::new();
        let a = dummy_job_handle();
        let b = dummy_job_handle();
        let c = dummy_job_handle();
        pending.append(a.clone());
        pending.append(b.clone());
        pending.append(c.clone());

        assert!(pending.remove(b.id()).is_some());
        assert_eq!(pending.peek().unwrap().id(), a.id());
        assert!(pending.remove(a.id()).is_some());
        assert_eq!(pending.peek().unwrap().id(), c.id());
    }

    #[test]
    fn remove_of_already_removed_job_returns_none() {
        let pending = PendingJobs::new();
        let a = dummy_job_handle();
        pending.append(a.clone());
        assert!(pending.remove(a.id()).is_some());
        assert!(pending.remove(a.id()).is_none());
    }

    #[test]
    fn clear_drops_every_pending_job() {
        let pending = PendingJobs::new();
        pending.append(dummy_job_handle());
        pending.append(dummy_job_handle());
        let dropped = pending.clear();
        assert_eq!(dropped.len(), 2);
        assert!(pending.is_empty());
    }
}
