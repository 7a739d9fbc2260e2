//! Opaque external collaborators.
//!
//! These traits are the seams the scheduling core talks across without
//! knowing their concrete shape: a persistent job record store, an
//! object-storage-backed blob sink, a remote batch-execution service, and
//! the two local execution substrates (containers, OS subprocesses). Per
//! §1's "Out of scope" list, loading `ProcessSpec`s from YAML and the HTTP
//! transport itself are *not* represented here — only the collaborators the
//! scheduling core actively calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{JobId, JobRecord};

/// Persists [`JobRecord`] snapshots. Out of scope per §1 ("Persistent job
/// record store"); this crate only depends on the trait plus an in-memory
/// reference implementation suitable for a single-node deployment.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn put(&self, record: JobRecord) -> Result<()>;
    async fn get(&self, job_id: JobId) -> Result<Option<JobRecord>>;
}

/// Uploads logs, metadata, and results. Out of scope per §1 ("Object storage
/// upload of logs/metadata/results"); `sepex-storage` supplies an
/// OpenDAL-backed implementation.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
}

/// A remote-batch job as submitted to [`AsyncBackend::submit`].
#[derive(Debug, Clone)]
pub struct RemoteSubmission {
    pub job_definition: String,
    pub job_queue: String,
    pub command: Vec<String>,
    pub env_vars: Vec<(String, String)>,
}

/// Terminal/non-terminal state as reported by a remote batch service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteJobState {
    Running,
    Succeeded,
    Failed,
}

/// The remote batch execution service. Out of scope per §1 ("The remote
/// batch backend driver"); it manages its own queue, so `RemoteJob` never
/// touches `ResourcePool`/`PendingJobs`.
#[async_trait]
pub trait AsyncBackend: Send + Sync {
    async fn submit(&self, submission: RemoteSubmission) -> Result<String>;
    async fn poll(&self, remote_job_id: &str) -> Result<RemoteJobState>;
    async fn cancel(&self, remote_job_id: &str) -> Result<()>;
}

/// A single JSONL log record, whatever its origin (container stdout line,
/// process stdout/stderr line).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: jiff::Timestamp,
    pub stream: LogStream,
    pub line: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// Parameters for starting a container job.
#[derive(Debug, Clone)]
pub struct ContainerSpawn {
    pub image: String,
    pub command: Vec<String>,
    pub env_vars: Vec<(String, String)>,
    pub volumes: Vec<(String, String)>,
    pub nano_cpus: u64,
    pub memory_bytes: u64,
}

/// Container execution substrate. Out of scope per §1 ("Container runtime
/// ... APIs"); `sepex-core` ships a thin Docker-CLI-shaped reference
/// implementation suitable for a single-node deployment.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Ensures `image` is present locally, pulling it if missing.
    async fn ensure_image(&self, image: &str) -> Result<()>;
    /// Starts a container, returning its runtime-assigned id.
    async fn start(&self, spawn: ContainerSpawn) -> Result<String>;
    /// Blocks until the container exits, returning its exit code.
    async fn wait(&self, container_id: &str) -> Result<i64>;
    /// Fetches the container's logs as JSONL records, one per stdout/stderr line.
    async fn logs(&self, container_id: &str) -> Result<Vec<LogRecord>>;
    /// Removes the container. Must be safe to call on an already-removed id.
    async fn remove(&self, container_id: &str) -> Result<()>;
    /// Best-effort digest lookup for metadata purposes; `None` if unavailable.
    async fn image_digest(&self, image: &str) -> Result<Option<String>>;
    /// Sends a termination signal to a still-running container.
    async fn kill(&self, container_id: &str) -> Result<()>;
}

/// Parameters for starting a subprocess job.
#[derive(Debug, Clone)]
pub struct ProcessSpawn {
    pub command: Vec<String>,
    pub env_vars: Vec<(String, String)>,
    pub log_path: std::path::PathBuf,
}

/// The outcome of waiting for a spawned subprocess.
#[derive(Debug, Clone, Copy)]
pub struct ProcessExit {
    pub code: Option<i32>,
    pub success: bool,
}

/// A handle to a live subprocess, returned by [`ProcessRuntime::spawn`].
#[async_trait]
pub trait ProcessHandle: Send + Sync {
    fn pid(&self) -> u32;
    async fn wait(&mut self) -> Result<ProcessExit>;
    async fn kill(&mut self) -> Result<()>;
}

/// OS subprocess execution substrate. Out of scope per §1 ("... OS
/// subprocess APIs"); `sepex-core` ships a `tokio::process`-backed reference
/// implementation suitable for a single-node deployment.
#[async_trait]
pub trait ProcessRuntime: Send + Sync {
    async fn spawn(&self, spawn: ProcessSpawn) -> Result<Box<dyn ProcessHandle>>;
}
