//! Turns a validated [`ProcessSpec`] plus caller inputs into a running (or
//! queued) [`JobHandle`], and handles cancellation requests.
//!
//! This is the one place that picks a [`JobBackend`](crate::job::JobBackend)
//! for a process, decides whether a job can run immediately or must queue,
//! and enforces the sync/async admission split described by the job control
//! options: a sync request either reserves resources and runs immediately or
//! is rejected outright (no job is ever created for a denied sync request);
//! an async request is always accepted and queued if capacity isn't
//! immediately available.

use std::collections::HashMap;
use std::sync::Arc;

use crate::active_jobs::ActiveJobs;
use crate::error::{Error, Result};
use crate::job::{self, ContainerJob, JobDeps, JobHandle, JobParams, RemoteJob, SubprocessJob};
use crate::model::{HostType, JobControlOption, JobId, JobStatus, ProcessSpec, ResourceLimits, ResourceRequest};
use crate::pending_jobs::PendingJobs;
use crate::resource_pool::ResourcePool;
use crate::scheduler::Scheduler;
use crate::traits::{AsyncBackend, ContainerRuntime, ProcessRuntime};

/// How the caller asked for a process to run. Only consulted for processes
/// whose `ProcessSpec` supports both; a process that only supports one mode
/// ignores the preference for the mode it can't do (rejected in
/// `ProcessSpec::validate_against` if neither is offered).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionPreference {
    Sync,
    Async,
}

/// A request to execute one job of a registered process.
pub struct DispatchRequest<'a> {
    pub process: &'a ProcessSpec,
    pub preference: ExecutionPreference,
    pub submitter: Option<String>,
    /// The raw inputs payload; its JSON encoding becomes the final argv
    /// element per the process I/O contract.
    pub inputs: serde_json::Value,
    /// Resolved env var values keyed by the (already-prefixed) name declared
    /// in `process.config.env_vars`. Loading these from the inputs payload
    /// is a transport-layer concern; the dispatcher only forwards them.
    pub env_values: HashMap<String, String>,
}

/// The result of a successful dispatch.
pub enum DispatchOutcome {
    /// An async (or queued) job; the caller should poll `GET /jobs/{id}`.
    Accepted { job_id: JobId, status: JobStatus },
    /// A sync job that has already reached a terminal status.
    Completed {
        job_id: JobId,
        status: JobStatus,
        results: Option<serde_json::Value>,
    },
}

/// Constructs the right [`JobBackend`](crate::job::JobBackend) for a
/// process's host type. Held by the [`Dispatcher`] so each runtime
/// collaborator is wired once at startup.
pub struct BackendFactory {
    pub container_runtime: Arc<dyn ContainerRuntime>,
    pub process_runtime: Arc<dyn ProcessRuntime>,
    pub async_backend: Arc<dyn AsyncBackend>,
}

impl BackendFactory {
    fn build(&self, process: &ProcessSpec) -> Result<Arc<dyn job::JobBackend>> {
        match process.host_type {
            HostType::Container => {
                let image = process
                    .image
                    .clone()
                    .ok_or_else(|| Error::invariant("container process missing image after validation"))?;
                Ok(Arc::new(ContainerJob::new(Arc::clone(&self.container_runtime), image)))
            }
            HostType::Subprocess => Ok(Arc::new(SubprocessJob::new(Arc::clone(&self.process_runtime)))),
            HostType::RemoteBatch => {
                let job_definition = process
                    .job_definition
                    .clone()
                    .ok_or_else(|| Error::invariant("remote-batch process missing jobDefinition after validation"))?;
                let job_queue = process
                    .job_queue
                    .clone()
                    .ok_or_else(|| Error::invariant("remote-batch process missing jobQueue after validation"))?;
                Ok(Arc::new(RemoteJob::new(Arc::clone(&self.async_backend), job_definition, job_queue)))
            }
        }
    }
}

/// Validates and admits jobs, bridging [`ProcessSpec`] registrations to the
/// scheduling primitives.
pub struct Dispatcher {
    limits: ResourceLimits,
    pool: Arc<ResourcePool>,
    pending: Arc<PendingJobs>,
    scheduler: Arc<Scheduler>,
    active_jobs: Arc<ActiveJobs>,
    deps: Arc<JobDeps>,
    backends: BackendFactory,
}

impl Dispatcher {
    pub fn new(
        limits: ResourceLimits,
        pool: Arc<ResourcePool>,
        pending: Arc<PendingJobs>,
        scheduler: Arc<Scheduler>,
        active_jobs: Arc<ActiveJobs>,
        deps: Arc<JobDeps>,
        backends: BackendFactory,
    ) -> Self {
        Self {
            limits,
            pool,
            pending,
            scheduler,
            active_jobs,
            deps,
            backends,
        }
    }

    /// Validates inputs against `process`'s declared descriptors, builds a
    /// job, and admits it per `request.preference`.
    pub async fn execute(&self, request: DispatchRequest<'_>) -> Result<DispatchOutcome> {
        let process = request.process;
        process.validate_against(&self.limits)?;
        self.validate_inputs(process, &request.inputs)?;
        self.validate_preference(process, request.preference)?;

        ensure_volumes(process).await?;

        let command = build_command(process, &request.inputs);
        let env_vars = resolve_env_vars(process, &request.env_values);
        let backend = self.backends.build(process)?;

        let resources = if process.host_type.is_local() {
            process.config.max_resources
        } else {
            ResourceRequest::zero()
        };

        match (process.host_type, request.preference) {
            (HostType::RemoteBatch, _) => {
                let job = self.new_job(process, &request, command, env_vars, resources, backend);
                self.active_jobs.add(job.clone())?;
                tokio::spawn(job::run(job.clone(), Arc::clone(&self.pool), Arc::clone(&self.deps)));
                Ok(DispatchOutcome::Accepted {
                    job_id: job.id(),
                    status: job.status(),
                })
            }
            (_, ExecutionPreference::Sync) => {
                if !self.pool.try_reserve(resources) {
                    return Err(Error::admission(
                        "insufficient local resources to run this process synchronously",
                    ));
                }
                let job = self.new_job(process, &request, command, env_vars, resources, backend);
                if let Err(err) = self.active_jobs.add(job.clone()) {
                    self.pool.release(resources);
                    return Err(err);
                }
                tokio::spawn(job::run(job.clone(), Arc::clone(&self.pool), Arc::clone(&self.deps)));
                job.wait_completion().await;
                Ok(DispatchOutcome::Completed {
                    job_id: job.id(),
                    status: job.status(),
                    results: job.results(),
                })
            }
            (_, ExecutionPreference::Async) => {
                let job = self.new_job(process, &request, command, env_vars, resources, backend);
                self.active_jobs.add(job.clone())?;
                self.scheduler.enqueue(job.clone());
                Ok(DispatchOutcome::Accepted {
                    job_id: job.id(),
                    status: job.status(),
                })
            }
        }
    }

    /// Cancels a non-terminal job. Removes it from the pending queue first
    /// if it hadn't started yet, racing safely against a concurrent
    /// admission via `PendingJobs::remove`'s already-removed-returns-`None`
    /// contract; otherwise relies on the job's own cancellation token being
    /// observed by whichever backend is currently running it.
    pub async fn dismiss(&self, job_id: JobId) -> Result<()> {
        let job = self
            .active_jobs
            .get(job_id)
            .ok_or_else(|| Error::validation(format!("job {job_id} not found")))?;

        if job.status().is_terminal() {
            return Err(Error::validation(format!("job {job_id} is already in a terminal state")));
        }

        if let Some(removed) = self.pending.remove(job_id) {
            self.pool.remove_queued(removed.resources());
        }

        job.request_dismiss(&self.deps.status_bus).await
    }

    fn new_job(
        &self,
        process: &ProcessSpec,
        request: &DispatchRequest<'_>,
        command: Vec<String>,
        env_vars: Vec<(String, String)>,
        resources: ResourceRequest,
        backend: Arc<dyn job::JobBackend>,
    ) -> JobHandle {
        JobHandle::new(JobParams {
            process_id: process.id.clone(),
            process_version: process.version.clone(),
            submitter: request.submitter.clone(),
            is_sync: request.preference == ExecutionPreference::Sync,
            host_type: process.host_type,
            command,
            env_vars,
            volumes: process.config.volumes.clone(),
            resources,
            backend,
            image: process.image.clone(),
        })
    }

    fn validate_inputs(&self, process: &ProcessSpec, inputs: &serde_json::Value) -> Result<()> {
        let serde_json::Value::Object(map) = inputs else {
            return Err(Error::validation("inputs must be a JSON object"));
        };
        for descriptor in &process.inputs {
            let occurrences = match map.get(&descriptor.id) {
                None => 0,
                Some(serde_json::Value::Array(values)) => values.len(),
                Some(_) => 1,
            };
            descriptor.validate_occurrences(occurrences)?;
        }
        Ok(())
    }

    fn validate_preference(&self, process: &ProcessSpec, preference: ExecutionPreference) -> Result<()> {
        let required = match preference {
            ExecutionPreference::Sync => JobControlOption::SyncExecute,
            ExecutionPreference::Async => JobControlOption::AsyncExecute,
        };
        if !process.job_control_options.contains(&required) {
            return Err(Error::validation(format!(
                "process '{}' does not support {:?} execution",
                process.id, preference
            )));
        }
        Ok(())
    }
}

/// Ensures every `host:container` volume binding's host-side directory
/// exists, creating it if absent. A path that exists but isn't a directory
/// fails the whole dispatch before any job is constructed, per step 4 of the
/// dispatcher's admission sequence.
async fn ensure_volumes(process: &ProcessSpec) -> Result<()> {
    for mount in &process.config.volumes {
        let path = std::path::Path::new(&mount.host_path);
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(Error::validation(format!(
                    "volume host path '{}' exists and is not a directory",
                    mount.host_path
                )));
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tokio::fs::create_dir_all(path).await.map_err(|err| {
                    Error::validation(format!(
                        "failed to create volume host path '{}': {err}",
                        mount.host_path
                    ))
                })?;
            }
            Err(err) => {
                return Err(Error::validation(format!(
                    "failed to stat volume host path '{}': {err}",
                    mount.host_path
                )));
            }
        }
    }
    Ok(())
}

fn build_command(process: &ProcessSpec, inputs: &serde_json::Value) -> Vec<String> {
    let mut command = process.command.clone();
    command.push(inputs.to_string());
    command
}

/// Resolves each declared env var to its forwarded `(name, value)` pair,
/// stripping the process-id prefix from the name before it reaches the job
/// per §4.9 step 3 (the prefix only exists to namespace inputs on the wire;
/// the child process sees the bare name).
fn resolve_env_vars(process: &ProcessSpec, env_values: &HashMap<String, String>) -> Vec<(String, String)> {
    let prefix = process.env_prefix();
    process
        .config
        .env_vars
        .iter()
        .map(|name| {
            let stripped = name.strip_prefix(&prefix).unwrap_or(name);
            (stripped.to_owned(), env_values.get(name).cloned().unwrap_or_default())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IoDescriptor, OutputTransmission, ProcessConfig};
    use std::collections::BTreeSet;

    fn echo_process() -> ProcessSpec {
        ProcessSpec {
            id: "echo".into(),
            title: "Echo".into(),
            version: "1.0.0".into(),
            description: "Echoes input".into(),
            job_control_options: BTreeSet::from([JobControlOption::SyncExecute, JobControlOption::AsyncExecute]),
            output_transmission: BTreeSet::from([OutputTransmission::Value]),
            host_type: HostType::Subprocess,
            image: None,
            job_definition: None,
            job_queue: None,
            command: vec!["/bin/echo".into()],
            config: ProcessConfig {
                env_vars: vec!["ECHO_MODE".into()],
                volumes: vec![],
                max_resources: ResourceRequest::new(0.1, 16),
            },
            inputs: vec![IoDescriptor {
                id: "message".into(),
                min_occurs: 1,
                max_occurs: Some(1),
                literal_data_domain: "string".into(),
            }],
            outputs: vec![],
        }
    }

    #[test]
    fn build_command_appends_json_encoded_inputs() {
        let process = echo_process();
        let inputs = serde_json::json!({ "message": "hi" });
        let command = build_command(&process, &inputs);
        assert_eq!(command.last().unwrap(), &inputs.to_string());
    }

    #[test]
    fn resolve_env_vars_defaults_missing_values_to_empty_string() {
        let process = echo_process();
        let env_vars = resolve_env_vars(&process, &HashMap::new());
        assert_eq!(env_vars, vec![("MODE".to_string(), String::new())]);
    }

    #[test]
    fn resolve_env_vars_strips_process_id_prefix() {
        let process = echo_process();
        let mut env_values = HashMap::new();
        env_values.insert("ECHO_MODE".to_string(), "fast".to_string());
        let env_vars = resolve_env_vars(&process, &env_values);
        assert_eq!(env_vars, vec![("MODE".to_string(), "fast".to_string())]);
    }

    #[tokio::test]
    async fn ensure_volumes_creates_missing_host_directory() {
        let temp = tempfile::tempdir().unwrap();
        let host_path = temp.path().join("does-not-exist-yet");
        let mut process = echo_process();
        process.host_type = HostType::Container;
        process.image = Some("alpine:3".into());
        process.config.volumes = vec![crate::model::VolumeMount {
            host_path: host_path.to_string_lossy().into_owned(),
            container_path: "/data".into(),
        }];

        ensure_volumes(&process).await.unwrap();
        assert!(host_path.is_dir());
    }

    #[tokio::test]
    async fn ensure_volumes_rejects_non_directory_host_path() {
        let temp = tempfile::tempdir().unwrap();
        let host_path = temp.path().join("a-file");
        std::fs::write(&host_path, b"not a directory").unwrap();
        let mut process = echo_process();
        process.host_type = HostType::Container;
        process.image = Some("alpine:3".into());
        process.config.volumes = vec![crate::model::VolumeMount {
            host_path: host_path.to_string_lossy().into_owned(),
            container_path: "/data".into(),
        }];

        let err = ensure_volumes(&process).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }

    struct UnreachableProcessRuntime;
    #[async_trait::async_trait]
    impl crate::traits::ProcessRuntime for UnreachableProcessRuntime {
        async fn spawn(
            &self,
            _spawn: crate::traits::ProcessSpawn,
        ) -> Result<Box<dyn crate::traits::ProcessHandle>> {
            unreachable!("sync admission must fail before a backend is ever run")
        }
    }

    struct UnreachableContainerRuntime;
    #[async_trait::async_trait]
    impl ContainerRuntime for UnreachableContainerRuntime {
        async fn ensure_image(&self, _image: &str) -> Result<()> {
            unreachable!("sync admission must fail before a backend is ever run")
        }
        async fn start(&self, _spawn: crate::traits::ContainerSpawn) -> Result<String> {
            unreachable!("sync admission must fail before a backend is ever run")
        }
        async fn wait(&self, _container_id: &str) -> Result<i64> {
            unreachable!("sync admission must fail before a backend is ever run")
        }
        async fn logs(&self, _container_id: &str) -> Result<Vec<crate::traits::LogRecord>> {
            unreachable!("sync admission must fail before a backend is ever run")
        }
        async fn remove(&self, _container_id: &str) -> Result<()> {
            unreachable!("sync admission must fail before a backend is ever run")
        }
        async fn image_digest(&self, _image: &str) -> Result<Option<String>> {
            unreachable!("sync admission must fail before a backend is ever run")
        }
        async fn kill(&self, _container_id: &str) -> Result<()> {
            unreachable!("sync admission must fail before a backend is ever run")
        }
    }

    struct UnreachableAsyncBackend;
    #[async_trait::async_trait]
    impl AsyncBackend for UnreachableAsyncBackend {
        async fn submit(&self, _submission: crate::traits::RemoteSubmission) -> Result<String> {
            unreachable!("sync admission must fail before a backend is ever run")
        }
        async fn poll(&self, _remote_job_id: &str) -> Result<crate::traits::RemoteJobState> {
            unreachable!("sync admission must fail before a backend is ever run")
        }
        async fn cancel(&self, _remote_job_id: &str) -> Result<()> {
            unreachable!("sync admission must fail before a backend is ever run")
        }
    }

    struct NoopJobStore;
    #[async_trait::async_trait]
    impl crate::traits::JobStore for NoopJobStore {
        async fn put(&self, _record: crate::model::JobRecord) -> Result<()> {
            Ok(())
        }
        async fn get(&self, _job_id: JobId) -> Result<Option<crate::model::JobRecord>> {
            Ok(None)
        }
    }

    struct NoopBlobStore;
    #[async_trait::async_trait]
    impl crate::traits::BlobStore for NoopBlobStore {
        async fn put(&self, _key: &str, _content_type: &str, _bytes: Vec<u8>) -> Result<()> {
            Ok(())
        }
        async fn get(&self, _key: &str) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    fn test_dispatcher(total: ResourceRequest) -> Dispatcher {
        let pool = Arc::new(ResourcePool::new(total));
        let pending = Arc::new(PendingJobs::new());
        let active_jobs = Arc::new(ActiveJobs::new());
        let (status_bus, _workers) = crate::status_bus::StatusBus::spawn(Arc::clone(&active_jobs));
        let deps = Arc::new(JobDeps {
            status_bus,
            job_store: Arc::new(NoopJobStore),
            blob_store: Arc::new(NoopBlobStore),
            metadata_prefix: "metadata".into(),
            results_prefix: "results".into(),
            log_dir: std::env::temp_dir(),
            log_retention: std::time::Duration::from_secs(1),
            context_url: "https://example.com/blob/main/context.jsonld".into(),
        });
        let scheduler = Scheduler::new(Arc::clone(&pending), Arc::clone(&pool), Arc::clone(&deps));
        let backends = BackendFactory {
            container_runtime: Arc::new(UnreachableContainerRuntime),
            process_runtime: Arc::new(UnreachableProcessRuntime),
            async_backend: Arc::new(UnreachableAsyncBackend),
        };
        Dispatcher::new(
            ResourceLimits::new(100.0, 1_000_000),
            pool,
            pending,
            scheduler,
            active_jobs,
            deps,
            backends,
        )
    }

    /// S5: a sync request that can't fit in the pool's remaining capacity is
    /// rejected outright with `Error::admission` — no job is ever created,
    /// and the pool's `used` accounting is left untouched.
    #[tokio::test]
    async fn sync_execute_rejects_when_pool_has_insufficient_capacity() {
        let dispatcher = test_dispatcher(ResourceRequest::new(0.05, 8));
        let process = echo_process();

        let request = DispatchRequest {
            process: &process,
            preference: ExecutionPreference::Sync,
            submitter: None,
            inputs: serde_json::json!({ "message": "hi" }),
            env_values: HashMap::new(),
        };

        let err = dispatcher.execute(request).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Admission);

        let snapshot = dispatcher.pool.snapshot();
        assert_eq!(snapshot.used.cpus, 0.0);
        assert_eq!(snapshot.used.memory_mb, 0);
    }
}
