//! Single-writer status propagation.
//!
//! Every status mutation funnels through one ordered channel consumed by a
//! single dedicated task, which is what lets [`JobHandle::apply_status`]
//! enforce the state machine without a per-job lock shared across writers.
//! A second channel (`doneChan` in the design notes) removes jobs from
//! [`ActiveJobs`] once their `Close` has run, decoupled from status so a
//! slow `ActiveJobs` removal never blocks a status read.

use std::sync::Arc;

use jiff::Timestamp;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::active_jobs::ActiveJobs;
use crate::job::JobHandle;
use crate::model::JobStatus;

/// Capacity for both channels. Generous enough that a burst of concurrent
/// transitions never blocks the sender on the consumer's pace.
const CHANNEL_CAPACITY: usize = 512;

const TRACING_TARGET: &str = "sepex_core::status_bus";

struct StatusMessage {
    job: JobHandle,
    status: JobStatus,
    at: Timestamp,
    ack: Option<oneshot::Sender<()>>,
}

/// Ordered status propagation plus active-set cleanup, each with its own
/// single-consumer task.
pub struct StatusBus {
    status_tx: mpsc::Sender<StatusMessage>,
    done_tx: mpsc::Sender<JobHandle>,
}

/// Join handles for the two consumer tasks, used by graceful shutdown to
/// wait for every already-enqueued message to drain before the process
/// exits.
pub struct StatusBusWorkers {
    pub status_worker: JoinHandle<()>,
    pub done_worker: JoinHandle<()>,
}

impl StatusBus {
    /// Spawns the two consumer tasks and returns the bus handle used to
    /// publish updates plus the workers' join handles.
    pub fn spawn(active_jobs: Arc<ActiveJobs>) -> (Arc<Self>, StatusBusWorkers) {
        let (status_tx, mut status_rx) = mpsc::channel::<StatusMessage>(CHANNEL_CAPACITY);
        let (done_tx, mut done_rx) = mpsc::channel::<JobHandle>(CHANNEL_CAPACITY);

        let status_worker = tokio::spawn(async move {
            while let Some(message) = status_rx.recv().await {
                let applied = message.job.apply_status(message.status, message.at);
                if applied {
                    tracing::info!(
                        target: TRACING_TARGET,
                        job_id = %message.job.id(),
                        status = %message.status,
                        "job status transitioned"
                    );
                }
                if let Some(ack) = message.ack {
                    let _ = ack.send(());
                }
            }
        });

        let done_worker = tokio::spawn(async move {
            while let Some(job) = done_rx.recv().await {
                active_jobs.remove(job.id());
            }
        });

        (
            Arc::new(Self { status_tx, done_tx }),
            StatusBusWorkers {
                status_worker,
                done_worker,
            },
        )
    }

    /// Publishes a status transition without waiting for it to be applied.
    /// Suitable for transitions whose ordering relative to the caller's own
    /// next step doesn't matter (e.g. a backend reporting progress).
    pub async fn transition(&self, job: &JobHandle, status: JobStatus) {
        let message = StatusMessage {
            job: job.clone(),
            status,
            at: Timestamp::now(),
            ack: None,
        };
        if self.status_tx.send(message).await.is_err() {
            tracing::error!(target: TRACING_TARGET, job_id = %job.id(), "status bus closed; transition dropped");
        }
    }

    /// Publishes a status transition and waits for the consumer to apply it.
    /// Used wherever a caller's subsequent read of `job.status()` must
    /// observe the new value, e.g. before returning a sync execution's
    /// response or before closing a job.
    pub async fn transition_and_wait(&self, job: &JobHandle, status: JobStatus) {
        let (ack_tx, ack_rx) = oneshot::channel();
        let message = StatusMessage {
            job: job.clone(),
            status,
            at: Timestamp::now(),
            ack: Some(ack_tx),
        };
        if self.status_tx.send(message).await.is_err() {
            tracing::error!(target: TRACING_TARGET, job_id = %job.id(), "status bus closed; transition dropped");
            return;
        }
        let _ = ack_rx.await;
    }

    /// Signals that `job` has finished `Close` and should leave `ActiveJobs`.
    pub async fn send_done(&self, job: JobHandle) {
        if self.done_tx.send(job.clone()).await.is_err() {
            tracing::error!(target: TRACING_TARGET, job_id = %job.id(), "status bus closed; done signal dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::test_support::dummy_job_handle;

    #[tokio::test]
    async fn transition_and_wait_applies_before_returning() {
        let active = Arc::new(ActiveJobs::new());
        let (bus, _workers) = StatusBus::spawn(active);
        let job = dummy_job_handle();

        bus.transition_and_wait(&job, JobStatus::Running).await;
        assert_eq!(job.status(), JobStatus::Running);
    }

    #[tokio::test]
    async fn illegal_transition_is_ignored_not_applied() {
        let active = Arc::new(ActiveJobs::new());
        let (bus, _workers) = StatusBus::spawn(active);
        let job = dummy_job_handle();

        bus.transition_and_wait(&job, JobStatus::Successful).await;
        assert_eq!(job.status(), JobStatus::Accepted);
    }

    #[tokio::test]
    async fn send_done_removes_job_from_active_set() {
        let active = Arc::new(ActiveJobs::new());
        let (bus, _workers) = StatusBus::spawn(Arc::clone(&active));
        let job = dummy_job_handle();
        active.add(job.clone()).unwrap();

        bus.send_done(job.clone()).await;
        // Give the dedicated consumer task a chance to run.
        for _ in 0..50 {
            if active.get(job.id()).is_none() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(active.get(job.id()).is_none());
    }
}
