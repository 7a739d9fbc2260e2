//! Container job backend: image pull-if-missing, start, wait, fetch logs,
//! remove — driven entirely through [`ContainerRuntime`].

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::job::{BackendKind, JobBackend, JobDeps, JobHandle};
use crate::traits::{ContainerRuntime, ContainerSpawn};

/// Runs a job inside a container via a [`ContainerRuntime`].
pub struct ContainerJob {
    runtime: Arc<dyn ContainerRuntime>,
    image: String,
    nano_cpus_per_cpu: u64,
}

impl ContainerJob {
    const BYTES_PER_MB: u64 = 1024 * 1024;
    /// Docker's `--cpus` is expressed in whole CPU units scaled by
    /// 1e9 ("nano CPUs"); this is the scaling factor applied to a job's
    /// fractional `cpus` request.
    const DEFAULT_NANO_CPUS_PER_CPU: u64 = 1_000_000_000;

    pub fn new(runtime: Arc<dyn ContainerRuntime>, image: impl Into<String>) -> Self {
        Self {
            runtime,
            image: image.into(),
            nano_cpus_per_cpu: Self::DEFAULT_NANO_CPUS_PER_CPU,
        }
    }
}

#[async_trait]
impl JobBackend for ContainerJob {
    fn kind(&self) -> BackendKind {
        BackendKind::Container
    }

    async fn execute(&self, job: &JobHandle, _deps: &JobDeps) -> Result<Option<serde_json::Value>> {
        self.runtime
            .ensure_image(&self.image)
            .await
            .map_err(|err| Error::backend("failed to ensure container image is present").with_source(err))?;

        match self.runtime.image_digest(&self.image).await {
            Ok(Some(digest)) => job.set_image_digest(digest),
            Ok(None) => {}
            Err(err) => tracing::warn!(
                target: "sepex_core::job::container",
                job_id = %job.id(),
                image = %self.image,
                error = %err,
                "failed to read image digest"
            ),
        }

        let resources = job.resources();
        let spawn = ContainerSpawn {
            image: self.image.clone(),
            command: job.command().to_vec(),
            env_vars: job.env_vars().to_vec(),
            volumes: job
                .volumes()
                .iter()
                .map(|mount| (mount.host_path.clone(), mount.container_path.clone()))
                .collect(),
            nano_cpus: (resources.cpus * self.nano_cpus_per_cpu as f64) as u64,
            memory_bytes: resources.memory_mb * Self::BYTES_PER_MB,
        };

        let container_id = self
            .runtime
            .start(spawn)
            .await
            .map_err(|err| Error::backend("failed to start container").with_source(err))?;
        job.set_provider_id(&container_id);

        let exit_code = tokio::select! {
            biased;
            _ = job.cancellation().cancelled() => {
                let _ = self.runtime.kill(&container_id).await;
                let _ = self.runtime.wait(&container_id).await;
                return Err(Error::dismissed_during_execution("job dismissed while container was running"));
            }
            exit_code = self.runtime.wait(&container_id) => {
                exit_code.map_err(|err| Error::execution("container wait failed").with_source(err))?
            }
        };

        if exit_code != 0 {
            return Err(Error::execution(format!(
                "container exited with code {exit_code}"
            )));
        }

        Ok(read_plugin_results(self.runtime.as_ref(), &container_id).await)
    }

    async fn terminate(&self, job: &JobHandle, _deps: &JobDeps) {
        if let Some(container_id) = job.provider_id()
            && let Err(err) = self.runtime.remove(&container_id).await
        {
            tracing::warn!(
                target: "sepex_core::job::container",
                job_id = %job.id(),
                container_id,
                error = %err,
                "failed to remove container during close"
            );
        }
    }
}

async fn read_plugin_results(
    runtime: &dyn ContainerRuntime,
    container_id: &str,
) -> Option<serde_json::Value> {
    let records = runtime.logs(container_id).await.ok()?;
    records
        .iter()
        .rev()
        .find_map(|record| serde_json::from_str::<serde_json::Value>(&record.line).ok())
        .and_then(|value| value.get("plugin_results").cloned())
}
