//! FIFO admission loop: moves jobs from [`PendingJobs`] into execution as
//! [`ResourcePool`] capacity frees up.
//!
//! Mirrors a single dedicated worker goroutine woken by two coalescing
//! signals (new work appended, resources released) plus a cancellation
//! signal for shutdown, implemented here as a `tokio::select!` over a
//! `CancellationToken` and two `tokio::sync::Notify`s.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::job::{self, JobDeps};
use crate::pending_jobs::PendingJobs;
use crate::resource_pool::ResourcePool;

const TRACING_TARGET: &str = "sepex_core::scheduler";

/// Drives [`PendingJobs`] against [`ResourcePool`] capacity, spawning each
/// admitted job's [`job::run`] as its own task.
pub struct Scheduler {
    pending: Arc<PendingJobs>,
    pool: Arc<ResourcePool>,
    deps: Arc<JobDeps>,
    work_signal: tokio::sync::Notify,
    shutdown: CancellationToken,
}

impl Scheduler {
    pub fn new(pending: Arc<PendingJobs>, pool: Arc<ResourcePool>, deps: Arc<JobDeps>) -> Arc<Self> {
        Arc::new(Self {
            pending,
            pool,
            deps,
            work_signal: tokio::sync::Notify::new(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Enqueues a job and wakes the drain loop. Called by the
    /// [`Dispatcher`](crate::dispatcher::Dispatcher) for every async-local
    /// admission.
    pub fn enqueue(&self, job: crate::job::JobHandle) {
        self.pool.add_queued(job.resources());
        self.pending.append(job);
        self.work_signal.notify_one();
    }

    /// A token that resolves once shutdown has been requested, for callers
    /// that need to race their own work against it.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawns the drain loop. Returns its join handle so callers can await
    /// it after calling [`Scheduler::shutdown`].
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// Requests shutdown: the drain loop stops admitting new jobs and
    /// returns once its current drain pass completes. Already-running jobs
    /// are untouched here — the caller is responsible for dismissing them
    /// via `ActiveJobs`, per the persistence non-goal (queued jobs are
    /// simply dropped, not resumed on restart).
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    async fn run(&self) {
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    tracing::info!(target: TRACING_TARGET, "scheduler shutting down; draining pending queue");
                    for job in self.pending.clear() {
                        self.pool.remove_queued(job.resources());
                    }
                    return;
                }
                _ = self.work_signal.notified() => {
                    self.drain().await;
                }
                _ = self.pool.notified() => {
                    self.drain().await;
                }
            }
        }
    }

    /// Admits every pending job that currently fits, in FIFO order, stopping
    /// at the first one that doesn't fit (a later, smaller job is not
    /// admitted ahead of it — no starvation-avoiding reordering, per the
    /// documented scheduling policy).
    async fn drain(&self) {
        loop {
            let Some(candidate) = self.pending.peek() else {
                return;
            };

            if !self.pool.try_reserve(candidate.resources()) {
                return;
            }

            // `peek` and `remove` are not atomic together: a concurrent
            // `Dismiss` may have already removed this job. Losing that race
            // means the reservation we just took is for a job that's no
            // longer pending, so give it back and retry the new head rather
            // than leaking the reservation.
            let Some(job) = self.pending.remove(candidate.id()) else {
                self.pool.release(candidate.resources());
                continue;
            };

            self.pool.remove_queued(job.resources());
            tracing::debug!(target: TRACING_TARGET, job_id = %job.id(), "admitted job from pending queue");
            tokio::spawn(job::run(job, Arc::clone(&self.pool), Arc::clone(&self.deps)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::test_support::NoopBackend;
    use crate::job::{JobDeps, JobParams};
    use crate::model::{HostType, JobStatus, ResourceRequest};
    use crate::status_bus::StatusBus;
    use crate::traits::{BlobStore, JobStore};

    struct NoopJobStore;
    #[async_trait::async_trait]
    impl JobStore for NoopJobStore {
        async fn put(&self, _record: crate::model::JobRecord) -> crate::error::Result<()> {
            Ok(())
        }
        async fn get(&self, _job_id: crate::model::JobId) -> crate::error::Result<Option<crate::model::JobRecord>> {
            Ok(None)
        }
    }

    struct NoopBlobStore;
    #[async_trait::async_trait]
    impl BlobStore for NoopBlobStore {
        async fn put(&self, _key: &str, _content_type: &str, _bytes: Vec<u8>) -> crate::error::Result<()> {
            Ok(())
        }
        async fn get(&self, _key: &str) -> crate::error::Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    fn test_deps() -> Arc<JobDeps> {
        let active = Arc::new(crate::active_jobs::ActiveJobs::new());
        let (status_bus, _workers) = StatusBus::spawn(active);
        Arc::new(JobDeps {
            status_bus,
            job_store: Arc::new(NoopJobStore),
            blob_store: Arc::new(NoopBlobStore),
            metadata_prefix: "metadata".into(),
            results_prefix: "results".into(),
            log_dir: std::env::temp_dir(),
            log_retention: std::time::Duration::from_secs(1),
            context_url: "https://example.com/blob/main/context.jsonld".into(),
        })
    }

    #[tokio::test]
    async fn admits_jobs_up_to_capacity_in_fifo_order() {
        let pending = Arc::new(PendingJobs::new());
        let pool = Arc::new(ResourcePool::new(ResourceRequest::new(1.0, 512)));
        let scheduler = Scheduler::new(pending, pool, test_deps());
        let handle = Arc::clone(&scheduler).spawn();

        let job = JobHandleFixture::new(0.5, 256).handle();
        scheduler.enqueue(job.clone());

        for _ in 0..100 {
            if job.status().is_terminal() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(job.status(), JobStatus::Successful);

        scheduler.shutdown();
        handle.await.unwrap();
    }

    /// A backend that blocks `execute` until its gate is released, for tests
    /// that need to observe a job holding resources mid-flight rather than
    /// completing instantly like [`NoopBackend`].
    struct GatedBackend {
        gate: Arc<tokio::sync::Notify>,
    }

    #[async_trait::async_trait]
    impl crate::job::JobBackend for GatedBackend {
        fn kind(&self) -> crate::job::BackendKind {
            crate::job::BackendKind::Subprocess
        }

        async fn execute(
            &self,
            _job: &crate::job::JobHandle,
            _deps: &JobDeps,
        ) -> crate::error::Result<Option<serde_json::Value>> {
            self.gate.notified().await;
            Ok(None)
        }

        async fn terminate(&self, _job: &crate::job::JobHandle, _deps: &JobDeps) {
            self.gate.notify_one();
        }
    }

    async fn yield_many() {
        for _ in 0..50 {
            tokio::task::yield_now().await;
        }
    }

    async fn wait_until_terminal(job: &crate::job::JobHandle) {
        for _ in 0..200 {
            if job.status().is_terminal() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("job {} did not reach a terminal status in time", job.id());
    }

    /// S2: with capacity for only one job, a second async submission stays
    /// queued until the first job releases its resources, then is admitted
    /// in turn.
    #[tokio::test]
    async fn second_job_stays_queued_while_first_holds_resources() {
        let pending = Arc::new(PendingJobs::new());
        let pool = Arc::new(ResourcePool::new(ResourceRequest::new(1.0, 512)));
        let scheduler = Scheduler::new(Arc::clone(&pending), Arc::clone(&pool), test_deps());
        let handle = Arc::clone(&scheduler).spawn();

        let gate = Arc::new(tokio::sync::Notify::new());
        let first = JobHandleFixture::new(1.0, 512).gated_handle(Arc::clone(&gate));
        scheduler.enqueue(first.clone());
        wait_until_terminal_or_running(&first).await;
        assert_eq!(first.status(), JobStatus::Running);

        let second = JobHandleFixture::new(0.1, 16).handle();
        scheduler.enqueue(second.clone());
        yield_many().await;

        assert_eq!(pending.len(), 1, "second job should still be queued while the pool is full");
        assert_eq!(second.status(), JobStatus::Accepted);

        gate.notify_one();
        wait_until_terminal(&first).await;
        assert_eq!(first.status(), JobStatus::Successful);

        wait_until_terminal(&second).await;
        assert_eq!(second.status(), JobStatus::Successful);
        assert!(pending.is_empty());

        scheduler.shutdown();
        handle.await.unwrap();
    }

    /// S3: dismissing a job that is still in the pending queue removes it
    /// before the scheduler ever admits it; it never transitions to
    /// `Running`, and its advisory queued accounting is released.
    #[tokio::test]
    async fn dismissing_a_queued_job_prevents_it_from_ever_running() {
        let pending = Arc::new(PendingJobs::new());
        let pool = Arc::new(ResourcePool::new(ResourceRequest::new(1.0, 512)));
        let scheduler = Scheduler::new(Arc::clone(&pending), Arc::clone(&pool), test_deps());
        let handle = Arc::clone(&scheduler).spawn();

        let gate = Arc::new(tokio::sync::Notify::new());
        let first = JobHandleFixture::new(1.0, 512).gated_handle(Arc::clone(&gate));
        scheduler.enqueue(first.clone());
        wait_until_terminal_or_running(&first).await;
        assert_eq!(first.status(), JobStatus::Running);

        let second = JobHandleFixture::new(0.1, 16).handle();
        scheduler.enqueue(second.clone());
        yield_many().await;
        assert_eq!(pending.len(), 1);

        // Mirrors `Dispatcher::dismiss`'s remove-then-release-queued sequence.
        let removed = pending.remove(second.id()).expect("job should still be pending");
        pool.remove_queued(removed.resources());

        gate.notify_one();
        wait_until_terminal(&first).await;
        yield_many().await;

        assert_eq!(second.status(), JobStatus::Accepted, "dismissed-while-queued job must never run");
        assert!(pending.is_empty());
        let snapshot = pool.snapshot();
        assert_eq!(snapshot.queued.cpus, 0.0);
        assert_eq!(snapshot.queued.memory_mb, 0);

        scheduler.shutdown();
        handle.await.unwrap();
    }

    async fn wait_until_terminal_or_running(job: &crate::job::JobHandle) {
        for _ in 0..200 {
            if job.status() == JobStatus::Running || job.status().is_terminal() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("job {} did not reach running/terminal status in time", job.id());
    }

    struct JobHandleFixture {
        cpus: f64,
        memory_mb: u64,
    }

    impl JobHandleFixture {
        fn new(cpus: f64, memory_mb: u64) -> Self {
            Self { cpus, memory_mb }
        }

        fn handle(&self) -> crate::job::JobHandle {
            self.handle_with_backend(Arc::new(NoopBackend))
        }

        fn gated_handle(&self, gate: Arc<tokio::sync::Notify>) -> crate::job::JobHandle {
            self.handle_with_backend(Arc::new(GatedBackend { gate }))
        }

        fn handle_with_backend(&self, backend: Arc<dyn crate::job::JobBackend>) -> crate::job::JobHandle {
            crate::job::JobHandle::new(JobParams {
                process_id: "echo".into(),
                process_version: "1.0.0".into(),
                submitter: None,
                is_sync: true,
                host_type: HostType::Subprocess,
                command: vec!["/bin/echo".into()],
                env_vars: vec![],
                volumes: vec![],
                resources: ResourceRequest::new(self.cpus, self.memory_mb),
                backend,
                image: None,
            })
        }
    }
}
