//! Subprocess job backend: a locally spawned OS process bound to the job's
//! cancellation token, with combined stdout/stderr captured as JSONL.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::job::{BackendKind, JobBackend, JobDeps, JobHandle};
use crate::traits::{ProcessRuntime, ProcessSpawn};

/// Runs a job as a plain OS subprocess via a [`ProcessRuntime`].
pub struct SubprocessJob {
    runtime: Arc<dyn ProcessRuntime>,
}

impl SubprocessJob {
    pub fn new(runtime: Arc<dyn ProcessRuntime>) -> Self {
        Self { runtime }
    }

    fn log_path(&self, job: &JobHandle, deps: &JobDeps) -> std::path::PathBuf {
        deps.log_dir.join(format!("{}.process.jsonl", job.id()))
    }
}

#[async_trait]
impl JobBackend for SubprocessJob {
    fn kind(&self) -> BackendKind {
        BackendKind::Subprocess
    }

    async fn execute(&self, job: &JobHandle, deps: &JobDeps) -> Result<Option<serde_json::Value>> {
        if let Some(parent) = self.log_path(job, deps).parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| Error::backend("failed to create job log directory").with_source(err))?;
        }

        let mut handle = self
            .runtime
            .spawn(ProcessSpawn {
                command: job.command().to_vec(),
                env_vars: job.env_vars().to_vec(),
                log_path: self.log_path(job, deps),
            })
            .await
            .map_err(|err| Error::backend("failed to spawn subprocess").with_source(err))?;

        job.set_provider_id(handle.pid().to_string());

        let exit = tokio::select! {
            biased;
            _ = job.cancellation().cancelled() => {
                let _ = handle.kill().await;
                let _ = handle.wait().await;
                return Err(Error::dismissed_during_execution("job dismissed while subprocess was running"));
            }
            exit = handle.wait() => exit.map_err(|err| Error::execution("subprocess wait failed").with_source(err))?,
        };

        if !exit.success {
            return Err(Error::execution(format!(
                "subprocess exited with code {:?}",
                exit.code
            )));
        }

        Ok(read_plugin_results(&self.log_path(job, deps)).await)
    }

    async fn terminate(&self, job: &JobHandle, deps: &JobDeps) {
        // Dismissal during `execute` already kills the child inline; this
        // only covers a dismissal that arrives before `execute` starts or
        // after it has already returned, where there is nothing left to
        // signal.
        let _ = (job, deps);
    }
}

/// Reads the job's log file looking for the final `{"plugin_results": ...}`
/// record, per the process I/O contract. Returns `None` if absent rather
/// than treating it as an error — a process may legitimately produce no
/// output.
async fn read_plugin_results(log_path: &std::path::Path) -> Option<serde_json::Value> {
    let contents = tokio::fs::read_to_string(log_path).await.ok()?;
    for line in contents.lines().rev() {
        let Ok(value) = serde_json::from_str::<serde_json::Value>(line) else {
            continue;
        };
        if let Some(results) = value.get("plugin_results") {
            return Some(results.clone());
        }
    }
    None
}
