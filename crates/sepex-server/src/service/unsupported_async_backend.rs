//! Placeholder [`AsyncBackend`] for deployments with no remote-batch driver
//! wired in.
//!
//! The remote batch execution service is explicitly out of scope for
//! `sepex-core` (it owns its own queue and never touches `ResourcePool`).
//! This stub lets a deployment run without one: `remote-batch` processes
//! fail validation-free admission with a clear backend error instead of the
//! binary refusing to start. A deployment with real remote-batch processes
//! registered supplies its own [`AsyncBackend`] to [`ServiceState::from_config`].

use async_trait::async_trait;
use sepex_core::Error;
use sepex_core::traits::{AsyncBackend, RemoteJobState, RemoteSubmission};

#[derive(Debug, Default)]
pub struct UnsupportedAsyncBackend;

#[async_trait]
impl AsyncBackend for UnsupportedAsyncBackend {
    async fn submit(&self, _submission: RemoteSubmission) -> sepex_core::Result<String> {
        Err(Error::backend(
            "no remote-batch backend is configured for this deployment",
        ))
    }

    async fn poll(&self, _remote_job_id: &str) -> sepex_core::Result<RemoteJobState> {
        Err(Error::backend(
            "no remote-batch backend is configured for this deployment",
        ))
    }

    async fn cancel(&self, _remote_job_id: &str) -> sepex_core::Result<()> {
        Err(Error::backend(
            "no remote-batch backend is configured for this deployment",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn submit_always_fails() {
        let backend = UnsupportedAsyncBackend;
        let submission = RemoteSubmission {
            job_definition: "def".into(),
            job_queue: "queue".into(),
            command: vec![],
            env_vars: vec![],
        };
        assert!(backend.submit(submission).await.is_err());
    }
}
