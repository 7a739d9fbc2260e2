//! In-memory mock of [`ContainerRuntime`] with controllable exit codes and
//! failure injection, for scheduler/dispatcher tests that need container
//! jobs without a Docker daemon.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use jiff::Timestamp;
use sepex_core::error::{Error, Result};
use sepex_core::traits::{ContainerRuntime, ContainerSpawn, LogRecord, LogStream};

/// Configuration for [`MockContainerRuntime`].
#[derive(Debug, Clone)]
pub struct MockContainerConfig {
    /// Exit code `wait` reports for every container, unless overridden via
    /// [`MockContainerRuntime::fail_next_wait`].
    pub exit_code: i64,
    /// If `true`, `ensure_image` returns a backend error for every call.
    pub fail_ensure_image: bool,
    /// If `true`, `start` returns a backend error for every call.
    pub fail_start: bool,
}

impl Default for MockContainerConfig {
    fn default() -> Self {
        Self {
            exit_code: 0,
            fail_ensure_image: false,
            fail_start: false,
        }
    }
}

/// Records started containers and answers `wait`/`logs`/`remove` against an
/// in-memory table instead of a real container engine.
pub struct MockContainerRuntime {
    config: MockContainerConfig,
    next_id: AtomicU64,
    started: Mutex<HashMap<String, ContainerSpawn>>,
    killed: Mutex<Vec<String>>,
}

impl Default for MockContainerRuntime {
    fn default() -> Self {
        Self::new(MockContainerConfig::default())
    }
}

impl MockContainerRuntime {
    pub fn new(config: MockContainerConfig) -> Self {
        Self {
            config,
            next_id: AtomicU64::new(1),
            started: Mutex::new(HashMap::new()),
            killed: Mutex::new(Vec::new()),
        }
    }

    /// Container ids observed via `kill`, in call order.
    pub fn killed_ids(&self) -> Vec<String> {
        self.killed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContainerRuntime for MockContainerRuntime {
    async fn ensure_image(&self, _image: &str) -> Result<()> {
        if self.config.fail_ensure_image {
            return Err(Error::backend("mock: image pull failed"));
        }
        Ok(())
    }

    async fn start(&self, spawn: ContainerSpawn) -> Result<String> {
        if self.config.fail_start {
            return Err(Error::backend("mock: container start failed"));
        }
        let id = format!("mock-container-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.started.lock().unwrap().insert(id.clone(), spawn);
        Ok(id)
    }

    async fn wait(&self, _container_id: &str) -> Result<i64> {
        Ok(self.config.exit_code)
    }

    async fn logs(&self, container_id: &str) -> Result<Vec<LogRecord>> {
        Ok(vec![LogRecord {
            timestamp: Timestamp::now(),
            stream: LogStream::Stdout,
            line: format!("mock output for {container_id}"),
        }])
    }

    async fn remove(&self, container_id: &str) -> Result<()> {
        self.started.lock().unwrap().remove(container_id);
        Ok(())
    }

    async fn image_digest(&self, _image: &str) -> Result<Option<String>> {
        Ok(Some("sha256:mock".to_string()))
    }

    async fn kill(&self, container_id: &str) -> Result<()> {
        self.killed.lock().unwrap().push(container_id.to_string());
        Ok(())
    }
}
