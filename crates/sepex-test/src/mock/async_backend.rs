//! In-memory mock of [`AsyncBackend`], the remote-batch execution service
//! seam used by `RemoteJob`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use sepex_core::error::Result;
use sepex_core::traits::{AsyncBackend, RemoteJobState, RemoteSubmission};

/// Configuration for [`MockAsyncBackend`].
#[derive(Debug, Clone, Default)]
pub struct MockAsyncBackendConfig {
    /// State `poll` reports after the configured number of polls have been
    /// observed for a given remote job id; before that, reports `Running`.
    pub polls_until_done: u32,
    /// Terminal state reported once `polls_until_done` is reached.
    pub terminal_state: MockTerminalState,
}

#[derive(Debug, Clone, Copy, Default)]
pub enum MockTerminalState {
    #[default]
    Succeeded,
    Failed,
}

/// Assigns sequential remote job ids and tracks poll counts per id, so tests
/// can drive a `RemoteJob` through a realistic running-then-terminal cycle.
pub struct MockAsyncBackend {
    config: MockAsyncBackendConfig,
    next_id: AtomicU64,
    poll_counts: Mutex<HashMap<String, u32>>,
    cancelled: Mutex<Vec<String>>,
}

impl Default for MockAsyncBackend {
    fn default() -> Self {
        Self::new(MockAsyncBackendConfig::default())
    }
}

impl MockAsyncBackend {
    pub fn new(config: MockAsyncBackendConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(1),
            poll_counts: Mutex::new(HashMap::new()),
            cancelled: Mutex::new(Vec::new()),
        }
    }

    /// Remote job ids observed via `cancel`, in call order.
    pub fn cancelled_ids(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl AsyncBackend for MockAsyncBackend {
    async fn submit(&self, _submission: RemoteSubmission) -> Result<String> {
        let id = format!("mock-remote-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.poll_counts.lock().unwrap().insert(id.clone(), 0);
        Ok(id)
    }

    async fn poll(&self, remote_job_id: &str) -> Result<RemoteJobState> {
        let mut counts = self.poll_counts.lock().unwrap();
        let count = counts.entry(remote_job_id.to_string()).or_insert(0);
        *count += 1;

        if *count <= self.config.polls_until_done {
            return Ok(RemoteJobState::Running);
        }

        Ok(match self.config.terminal_state {
            MockTerminalState::Succeeded => RemoteJobState::Succeeded,
            MockTerminalState::Failed => RemoteJobState::Failed,
        })
    }

    async fn cancel(&self, remote_job_id: &str) -> Result<()> {
        self.cancelled.lock().unwrap().push(remote_job_id.to_string());
        Ok(())
    }
}
