//! Remote batch job backend: submits to an [`AsyncBackend`] and polls it to
//! completion. Never touches `ResourcePool`/`PendingJobs` — the remote
//! service owns its own admission and queueing, which is exactly why
//! `ResourcePool`'s accounting is scoped to local jobs only.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::job::{BackendKind, JobBackend, JobDeps, JobHandle};
use crate::traits::{AsyncBackend, RemoteJobState, RemoteSubmission};

/// The interval at which a remote job's state is polled.
const POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Runs a job on a remote batch service via an [`AsyncBackend`].
pub struct RemoteJob {
    backend: Arc<dyn AsyncBackend>,
    job_definition: String,
    job_queue: String,
}

impl RemoteJob {
    pub fn new(backend: Arc<dyn AsyncBackend>, job_definition: impl Into<String>, job_queue: impl Into<String>) -> Self {
        Self {
            backend,
            job_definition: job_definition.into(),
            job_queue: job_queue.into(),
        }
    }
}

#[async_trait]
impl JobBackend for RemoteJob {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn execute(&self, job: &JobHandle, _deps: &JobDeps) -> Result<Option<serde_json::Value>> {
        let remote_job_id = self
            .backend
            .submit(RemoteSubmission {
                job_definition: self.job_definition.clone(),
                job_queue: self.job_queue.clone(),
                command: job.command().to_vec(),
                env_vars: job.env_vars().to_vec(),
            })
            .await
            .map_err(|err| Error::backend("failed to submit remote job").with_source(err))?;
        job.set_provider_id(&remote_job_id);

        loop {
            tokio::select! {
                biased;
                _ = job.cancellation().cancelled() => {
                    let _ = self.backend.cancel(&remote_job_id).await;
                    return Err(Error::dismissed_during_execution("job dismissed while remote job was running"));
                }
                _ = tokio::time::sleep(POLL_INTERVAL) => {
                    match self.backend.poll(&remote_job_id).await {
                        Ok(RemoteJobState::Running) => continue,
                        Ok(RemoteJobState::Succeeded) => return Ok(None),
                        Ok(RemoteJobState::Failed) => {
                            return Err(Error::execution("remote job reported a failed state"));
                        }
                        Err(err) => {
                            return Err(Error::backend("failed to poll remote job state").with_source(err));
                        }
                    }
                }
            }
        }
    }

    async fn terminate(&self, job: &JobHandle, _deps: &JobDeps) {
        if let Some(remote_job_id) = job.provider_id()
            && let Err(err) = self.backend.cancel(&remote_job_id).await
        {
            tracing::debug!(
                target: "sepex_core::job::remote",
                job_id = %job.id(),
                remote_job_id,
                error = %err,
                "remote cancel during close failed (job may have already finished)"
            );
        }
    }
}
