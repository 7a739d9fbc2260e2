//! In-memory mock of [`ProcessRuntime`] with a controllable run duration and
//! exit code, for scheduler tests that exercise subprocess jobs without
//! actually forking.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sepex_core::error::Result;
use sepex_core::traits::{ProcessExit, ProcessHandle, ProcessRuntime, ProcessSpawn};
use tokio_util::sync::CancellationToken;

/// Configuration for [`MockProcessRuntime`].
#[derive(Debug, Clone)]
pub struct MockProcessConfig {
    /// How long `wait` sleeps before returning, simulating process runtime.
    pub run_for: Duration,
    /// Exit code reported on a natural (non-killed) completion.
    pub exit_code: i32,
}

impl Default for MockProcessConfig {
    fn default() -> Self {
        Self {
            run_for: Duration::from_millis(10),
            exit_code: 0,
        }
    }
}

/// Spawns [`MockProcessHandle`]s instead of real OS processes.
#[derive(Default)]
pub struct MockProcessRuntime {
    config: MockProcessConfig,
}

impl MockProcessRuntime {
    pub fn new(config: MockProcessConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ProcessRuntime for MockProcessRuntime {
    async fn spawn(&self, _spawn: ProcessSpawn) -> Result<Box<dyn ProcessHandle>> {
        Ok(Box::new(MockProcessHandle {
            pid: 1,
            run_for: self.config.run_for,
            exit_code: self.config.exit_code,
            killed: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
        }))
    }
}

/// A fake subprocess that sleeps for `run_for` then reports `exit_code`,
/// unless [`ProcessHandle::kill`] fires first.
pub struct MockProcessHandle {
    pid: u32,
    run_for: Duration,
    exit_code: i32,
    killed: Arc<AtomicBool>,
    cancel: CancellationToken,
}

#[async_trait]
impl ProcessHandle for MockProcessHandle {
    fn pid(&self) -> u32 {
        self.pid
    }

    async fn wait(&mut self) -> Result<ProcessExit> {
        tokio::select! {
            _ = tokio::time::sleep(self.run_for) => {}
            _ = self.cancel.cancelled() => {}
        }

        if self.killed.load(Ordering::SeqCst) {
            return Ok(ProcessExit {
                code: None,
                success: false,
            });
        }

        Ok(ProcessExit {
            code: Some(self.exit_code),
            success: self.exit_code == 0,
        })
    }

    async fn kill(&mut self) -> Result<()> {
        self.killed.store(true, Ordering::SeqCst);
        self.cancel.cancel();
        Ok(())
    }
}
