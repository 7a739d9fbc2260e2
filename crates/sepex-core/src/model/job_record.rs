//! The serializable, at-rest projection of a [`Job`](crate::job::Job).
//!
//! A [`JobHandle`](crate::job::JobHandle) is the live, mutable, `Arc`-shared
//! runtime object; `JobRecord` is the point-in-time snapshot persisted to
//! `JobStore` and returned by the HTTP status/metadata endpoints.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::model::ids::JobId;
use crate::model::job_status::JobStatus;
use crate::model::process_spec::VolumeMount;
use crate::model::resources::ResourceRequest;

/// A point-in-time, serializable snapshot of a job's mutable record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub process_id: String,
    pub process_version: String,
    pub submitter: Option<String>,
    pub status: JobStatus,
    pub update_time: Timestamp,
    /// Container id / PID / remote job id, once the backend has started.
    pub provider_id: Option<String>,
    /// Final argv, including the trailing JSON-encoded inputs blob.
    pub command: Vec<String>,
    /// Resolved `name=value` environment, prefix already stripped.
    pub env_vars: Vec<(String, String)>,
    pub volumes: Vec<VolumeMount>,
    pub resources: ResourceRequest,
    pub is_sync: bool,
    pub started_at: Option<Timestamp>,
    pub ended_at: Option<Timestamp>,
}
