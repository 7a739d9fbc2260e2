//! The live, `Arc`-shared job object and the backend seam that runs it.
//!
//! A [`JobHandle`] is cheap to clone and is what `PendingJobs`, `ActiveJobs`,
//! and `StatusBus` all hand around. Its mutable fields are guarded
//! individually rather than behind one big lock, because each is owned by a
//! different writer: `status` is written exclusively by the `StatusBus`
//! consumer task (§4.4's single-writer ordering guarantee), the timing and
//! provider-id fields are written by whichever backend is currently running
//! the job, and `results`/`ended_at` are written once by [`run`] itself.

mod container;
mod finisher;
mod remote;
mod subprocess;

pub use container::ContainerJob;
pub use remote::RemoteJob;
pub use subprocess::SubprocessJob;

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use futures::FutureExt;
use jiff::Timestamp;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, ErrorKind, Result};
use crate::model::{HostType, JobId, JobStatus, ResourceRequest, VolumeMount};
use crate::status_bus::StatusBus;
use crate::traits::{BlobStore, JobStore};

const TRACING_TARGET: &str = "sepex_core::job";

/// Which concrete backend is driving a job, for logging and `/admin` views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Container,
    Subprocess,
    Remote,
}

/// Collaborators a running job needs, shared across every job the scheduler
/// is currently driving. Constructed once at server startup.
pub struct JobDeps {
    pub status_bus: Arc<StatusBus>,
    pub job_store: Arc<dyn JobStore>,
    pub blob_store: Arc<dyn BlobStore>,
    pub metadata_prefix: String,
    pub results_prefix: String,
    pub log_dir: std::path::PathBuf,
    pub log_retention: std::time::Duration,
    /// `@context` embedded in every job's JSON-LD metadata document.
    pub context_url: String,
}

/// A backend that can run one [`JobHandle`] to completion.
///
/// Implemented by [`ContainerJob`], [`SubprocessJob`], and [`RemoteJob`].
/// Kept as a trait object (not an enum) so the scheduler, `ActiveJobs`, and
/// `StatusBus` stay backend-agnostic; new host types only require a new
/// implementor, never a match arm threaded through the core.
#[async_trait]
pub trait JobBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Drives the job to a result. Resource reservation/release and status
    /// transitions are handled by [`run`] around this call; implementors
    /// only report their own outcome.
    ///
    /// A `DismissedDuringExecution` error must be returned if the backend
    /// observes `job.cancellation().is_cancelled()` became true *during* the
    /// wait, as distinct from a genuine execution failure.
    async fn execute(&self, job: &JobHandle, deps: &JobDeps) -> Result<Option<serde_json::Value>>;

    /// Best-effort termination of a job that may still be running. Must be
    /// safe to call on a job that has already finished or was never started
    /// (e.g. dismissed while still queued).
    async fn terminate(&self, job: &JobHandle, deps: &JobDeps);
}

struct JobTiming {
    started_at: Option<Timestamp>,
    ended_at: Option<Timestamp>,
}

struct JobCore {
    id: JobId,
    process_id: String,
    process_version: String,
    submitter: Option<String>,
    is_sync: bool,
    host_type: HostType,
    command: Vec<String>,
    env_vars: Vec<(String, String)>,
    volumes: Vec<VolumeMount>,
    resources: ResourceRequest,
    backend: Arc<dyn JobBackend>,
    /// The container image reference, for container-backed jobs only.
    image: Option<String>,

    status: RwLock<JobStatus>,
    update_time: RwLock<Timestamp>,
    timing: Mutex<JobTiming>,
    provider_id: Mutex<Option<String>>,
    image_digest: Mutex<Option<String>>,
    results: Mutex<Option<serde_json::Value>>,

    cancellation: CancellationToken,
    closed: AtomicBool,
    completion_tx: watch::Sender<bool>,
    completion_rx: watch::Receiver<bool>,
    side_tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Everything needed to construct a job, supplied by the
/// [`Dispatcher`](crate::dispatcher::Dispatcher) at admission time.
pub struct JobParams {
    pub process_id: String,
    pub process_version: String,
    pub submitter: Option<String>,
    pub is_sync: bool,
    pub host_type: HostType,
    pub command: Vec<String>,
    pub env_vars: Vec<(String, String)>,
    pub volumes: Vec<VolumeMount>,
    pub resources: ResourceRequest,
    pub backend: Arc<dyn JobBackend>,
    /// The container image reference, for container-backed jobs only.
    pub image: Option<String>,
}

/// A cheap-to-clone handle to a live job. Every clone refers to the same
/// underlying state.
#[derive(Clone)]
pub struct JobHandle(Arc<JobCore>);

impl JobHandle {
    /// Creates a new job in [`JobStatus::Accepted`].
    pub fn new(params: JobParams) -> Self {
        let (completion_tx, completion_rx) = watch::channel(false);
        Self(Arc::new(JobCore {
            id: JobId::generate(),
            process_id: params.process_id,
            process_version: params.process_version,
            submitter: params.submitter,
            is_sync: params.is_sync,
            host_type: params.host_type,
            command: params.command,
            env_vars: params.env_vars,
            volumes: params.volumes,
            resources: params.resources,
            backend: params.backend,
            image: params.image,
            status: RwLock::new(JobStatus::Accepted),
            update_time: RwLock::new(Timestamp::now()),
            timing: Mutex::new(JobTiming {
                started_at: None,
                ended_at: None,
            }),
            provider_id: Mutex::new(None),
            image_digest: Mutex::new(None),
            results: Mutex::new(None),
            cancellation: CancellationToken::new(),
            closed: AtomicBool::new(false),
            completion_tx,
            completion_rx,
            side_tasks: Mutex::new(Vec::new()),
        }))
    }

    pub fn id(&self) -> JobId {
        self.0.id
    }

    pub fn process_id(&self) -> &str {
        &self.0.process_id
    }

    pub fn process_version(&self) -> &str {
        &self.0.process_version
    }

    pub fn submitter(&self) -> Option<&str> {
        self.0.submitter.as_deref()
    }

    pub fn is_sync(&self) -> bool {
        self.0.is_sync
    }

    pub fn host_type(&self) -> HostType {
        self.0.host_type
    }

    pub fn command(&self) -> &[String] {
        &self.0.command
    }

    pub fn env_vars(&self) -> &[(String, String)] {
        &self.0.env_vars
    }

    pub fn volumes(&self) -> &[VolumeMount] {
        &self.0.volumes
    }

    pub fn resources(&self) -> ResourceRequest {
        self.0.resources
    }

    pub fn backend(&self) -> Arc<dyn JobBackend> {
        Arc::clone(&self.0.backend)
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.0.backend.kind()
    }

    pub fn status(&self) -> JobStatus {
        *self.0.status.read().expect("job status lock poisoned")
    }

    pub fn update_time(&self) -> Timestamp {
        *self.0.update_time.read().expect("job update_time lock poisoned")
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.0.cancellation
    }

    pub fn provider_id(&self) -> Option<String> {
        self.0.provider_id.lock().expect("job provider_id lock poisoned").clone()
    }

    pub fn set_provider_id(&self, provider_id: impl Into<String>) {
        *self.0.provider_id.lock().expect("job provider_id lock poisoned") = Some(provider_id.into());
    }

    /// The container image reference, for container-backed jobs only.
    pub fn image(&self) -> Option<&str> {
        self.0.image.as_deref()
    }

    pub fn image_digest(&self) -> Option<String> {
        self.0.image_digest.lock().expect("job image_digest lock poisoned").clone()
    }

    pub fn set_image_digest(&self, digest: impl Into<String>) {
        *self.0.image_digest.lock().expect("job image_digest lock poisoned") = Some(digest.into());
    }

    pub fn started_at(&self) -> Option<Timestamp> {
        self.0.timing.lock().expect("job timing lock poisoned").started_at
    }

    pub fn ended_at(&self) -> Option<Timestamp> {
        self.0.timing.lock().expect("job timing lock poisoned").ended_at
    }

    fn set_started_at(&self, at: Timestamp) {
        self.0.timing.lock().expect("job timing lock poisoned").started_at = Some(at);
    }

    fn set_ended_at(&self, at: Timestamp) {
        self.0.timing.lock().expect("job timing lock poisoned").ended_at = Some(at);
    }

    pub fn results(&self) -> Option<serde_json::Value> {
        self.0.results.lock().expect("job results lock poisoned").clone()
    }

    fn set_results(&self, results: serde_json::Value) {
        *self.0.results.lock().expect("job results lock poisoned") = Some(results);
    }

    /// Applies a status transition. Called *only* by the `StatusBus`
    /// consumer task, which is the sole writer of `status`/`update_time` and
    /// therefore the sole enforcer of the state machine and of monotonic
    /// update ordering; every other call site goes through
    /// `StatusBus::transition`/`transition_and_wait`.
    pub(crate) fn apply_status(&self, status: JobStatus, at: Timestamp) -> bool {
        let mut current = self.0.status.write().expect("job status lock poisoned");
        if !current.can_transition_to(status) {
            tracing::warn!(
                target: TRACING_TARGET,
                job_id = %self.0.id,
                from = %*current,
                to = %status,
                "ignored illegal status transition"
            );
            return false;
        }
        *current = status;
        drop(current);
        *self.0.update_time.write().expect("job update_time lock poisoned") = at;
        true
    }

    /// Requests termination. A no-op if the job has already reached a
    /// terminal status. Sets `Dismissed` directly (rather than going through
    /// `execute`'s own outcome) so a caller polling status immediately after
    /// `Dismiss` sees the new state even before the backend notices the
    /// cancellation.
    pub async fn request_dismiss(&self, status_bus: &StatusBus) -> Result<()> {
        if self.status().is_terminal() {
            return Err(Error::validation(format!(
                "job {} is already in a terminal state",
                self.0.id
            )));
        }
        self.0.cancellation.cancel();
        status_bus.transition_and_wait(self, JobStatus::Dismissed).await;
        Ok(())
    }

    /// Registers a detached cleanup task so graceful shutdown can wait for it.
    fn track_side_task(&self, handle: JoinHandle<()>) {
        self.0.side_tasks.lock().expect("job side_tasks lock poisoned").push(handle);
    }

    /// Joins every tracked side task, e.g. during graceful shutdown. Side
    /// tasks that already finished resolve immediately.
    pub async fn join_side_tasks(&self) {
        let handles = std::mem::take(&mut *self.0.side_tasks.lock().expect("job side_tasks lock poisoned"));
        for handle in handles {
            if let Err(err) = handle.await {
                tracing::warn!(target: TRACING_TARGET, job_id = %self.0.id, error = %err, "side task panicked");
            }
        }
    }

    /// Resolves once the job has fully finished `run` (terminal status
    /// observed and `close` invoked), mirroring a Go `sync.WaitGroup`'s
    /// `Wait` on the per-job "wgRun" group. Safe to call concurrently from
    /// any number of waiters and safe to call after the job already finished.
    pub async fn wait_completion(&self) {
        let mut rx = self.0.completion_rx.clone();
        if *rx.borrow() {
            return;
        }
        let _ = rx.changed().await;
    }

    fn resolve_completion(&self) {
        let _ = self.0.completion_tx.send(true);
    }

    /// Idempotent close: cancels the job, asks the backend to terminate any
    /// still-running work, removes it from `ActiveJobs` via `StatusBus`'s
    /// `doneChan`, and spawns the detached finisher that persists metadata,
    /// uploads logs, and eventually deletes the local log file. Safe to call
    /// more than once or concurrently; only the first caller does anything.
    async fn close(&self, backend: &dyn JobBackend, deps: &Arc<JobDeps>) {
        if self.0.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.0.cancellation.cancel();
        backend.terminate(self, deps).await;
        deps.status_bus.send_done(self.clone()).await;

        let finisher = finisher::spawn_finisher(self.clone(), Arc::clone(deps));
        self.track_side_task(finisher);
    }
}

/// RAII backstop that guarantees a job's resources are released exactly
/// once, even if `execute` panics past the `catch_unwind` boundary (which
/// can only happen for aborts, not ordinary panics, but costs nothing to
/// guard against). The linear `run` path always calls
/// [`RunGuard::release`] explicitly; `Drop` only fires if that never
/// happened.
struct RunGuard<'a> {
    resources: ResourceRequest,
    pool: &'a crate::resource_pool::ResourcePool,
    released: bool,
}

impl<'a> RunGuard<'a> {
    fn new(resources: ResourceRequest, pool: &'a crate::resource_pool::ResourcePool) -> Self {
        Self {
            resources,
            pool,
            released: false,
        }
    }

    fn release(&mut self) {
        if !self.released {
            self.pool.release(self.resources);
            self.released = true;
        }
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Runs `job` to completion against `backend`, sharing `pool` for the
/// resource-release guard and `deps` for everything else. Spawned by the
/// scheduler exactly once per job, never called directly by handlers.
///
/// Sequencing: `accepted -> running` (awaited, so any sync caller observing
/// this job's status after this point sees `running` or later), execute
/// under `catch_unwind`, resolve the terminal status, release resources,
/// close, then resolve the per-job completion waiter. Resource release
/// happens *before* close/finisher spawn so `/admin/resources` reflects
/// completion promptly even while metadata upload is still in flight.
pub async fn run(job: JobHandle, pool: Arc<crate::resource_pool::ResourcePool>, deps: Arc<JobDeps>) {
    let backend = job.backend();
    let mut guard = RunGuard::new(job.resources(), &pool);

    deps.status_bus.transition_and_wait(&job, JobStatus::Running).await;
    job.set_started_at(Timestamp::now());

    let outcome = run_catching_panics(backend.execute(&job, &deps)).await;

    let next_status = match outcome {
        Ok(results) => {
            if job.status().is_terminal() {
                // Dismissed while execute() was already unwinding toward success.
                job.status()
            } else {
                if let Some(results) = results {
                    job.set_results(results);
                }
                JobStatus::Successful
            }
        }
        Err(err) if err.kind() == ErrorKind::DismissedDuringExecution => JobStatus::Dismissed,
        Err(err) => {
            tracing::error!(target: TRACING_TARGET, job_id = %job.id(), error = %err, "job execution failed");
            JobStatus::Failed
        }
    };

    job.set_ended_at(Timestamp::now());
    if !job.status().is_terminal() {
        deps.status_bus.transition_and_wait(&job, next_status).await;
    }

    guard.release();
    job.close(backend.as_ref(), &deps).await;
    job.resolve_completion();
}

async fn run_catching_panics<F>(future: F) -> Result<Option<serde_json::Value>>
where
    F: Future<Output = Result<Option<serde_json::Value>>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "job backend panicked".to_string());
            Err(Error::invariant(format!("job backend panicked: {message}")))
        }
    }
}

#[doc(hidden)]
pub mod test_support {
    use super::*;

    /// A backend that never actually runs anything, for tests of
    /// `PendingJobs`/`ActiveJobs`/`Scheduler` that only care about queueing
    /// and bookkeeping, not execution.
    pub struct NoopBackend;

    #[async_trait]
    impl JobBackend for NoopBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Subprocess
        }

        async fn execute(&self, _job: &JobHandle, _deps: &JobDeps) -> Result<Option<serde_json::Value>> {
            Ok(None)
        }

        async fn terminate(&self, _job: &JobHandle, _deps: &JobDeps) {}
    }

    /// A minimal [`JobHandle`] for unit tests of `PendingJobs`/`ActiveJobs`
    /// that don't exercise `run`/backends.
    pub fn dummy_job_handle() -> JobHandle {
        JobHandle::new(JobParams {
            process_id: "echo".into(),
            process_version: "1.0.0".into(),
            submitter: None,
            is_sync: true,
            host_type: HostType::Subprocess,
            command: vec!["/bin/echo".into()],
            env_vars: vec![],
            volumes: vec![],
            resources: ResourceRequest::new(0.1, 16),
            backend: Arc::new(NoopBackend),
            image: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::dummy_job_handle;
    use super::*;

    #[test]
    fn new_job_starts_accepted() {
        let job = dummy_job_handle();
        assert_eq!(job.status(), JobStatus::Accepted);
        assert!(!job.cancellation().is_cancelled());
    }

    #[test]
    fn apply_status_enforces_state_machine() {
        let job = dummy_job_handle();
        assert!(job.apply_status(JobStatus::Running, Timestamp::now()));
        assert!(!job.apply_status(JobStatus::Accepted, Timestamp::now()));
        assert_eq!(job.status(), JobStatus::Running);
    }

    #[tokio::test]
    async fn wait_completion_resolves_after_resolve_completion() {
        let job = dummy_job_handle();
        let waiter = {
            let job = job.clone();
            tokio::spawn(async move { job.wait_completion().await })
        };
        tokio::task::yield_now().await;
        job.resolve_completion();
        waiter.await.expect("waiter task panicked");
    }

    #[tokio::test]
    async fn wait_completion_returns_immediately_if_already_resolved() {
        let job = dummy_job_handle();
        job.resolve_completion();
        job.wait_completion().await;
    }
}
