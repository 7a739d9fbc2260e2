//! Request and response bodies for the HTTP surface.
//!
//! `sepex-core`'s types are transport-agnostic and do not derive
//! `schemars::JsonSchema`; these DTOs are the one place that decides what a
//! caller actually sees on the wire and carries the OpenAPI schema for it.

use std::collections::BTreeSet;

use schemars::JsonSchema;
use sepex_core::model::{
    JobControlOption, JobStatus, OutputTransmission, ProcessSpec, ResourceRequest,
};
use sepex_core::{ServiceHealth, ServiceStatus};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A single registered process, as listed by `GET /processes`.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ProcessSummary {
    pub id: String,
    pub title: String,
    pub version: String,
    pub description: String,
}

/// The full description of a registered process, as returned by
/// `GET /processes/{id}`.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ProcessDescription {
    pub id: String,
    pub title: String,
    pub version: String,
    pub description: String,
    pub job_control_options: BTreeSet<String>,
    pub output_transmission: BTreeSet<String>,
}

impl From<&ProcessSpec> for ProcessSummary {
    fn from(spec: &ProcessSpec) -> Self {
        Self {
            id: spec.id.clone(),
            title: spec.title.clone(),
            version: spec.version.clone(),
            description: spec.description.clone(),
        }
    }
}

impl From<&ProcessSpec> for ProcessDescription {
    fn from(spec: &ProcessSpec) -> Self {
        Self {
            id: spec.id.clone(),
            title: spec.title.clone(),
            version: spec.version.clone(),
            description: spec.description.clone(),
            job_control_options: spec
                .job_control_options
                .iter()
                .map(|opt| job_control_option_name(*opt).to_owned())
                .collect(),
            output_transmission: spec
                .output_transmission
                .iter()
                .map(|t| output_transmission_name(*t).to_owned())
                .collect(),
        }
    }
}

fn job_control_option_name(option: JobControlOption) -> &'static str {
    match option {
        JobControlOption::SyncExecute => "sync-execute",
        JobControlOption::AsyncExecute => "async-execute",
    }
}

fn output_transmission_name(transmission: OutputTransmission) -> &'static str {
    match transmission {
        OutputTransmission::Reference => "reference",
        OutputTransmission::Value => "value",
    }
}

/// Body of `POST /processes/{id}/execution`.
#[derive(Debug, Clone, Deserialize, JsonSchema, Validate)]
pub struct ExecuteRequest {
    /// Input values keyed by the process's declared input ids.
    #[serde(default)]
    pub inputs: serde_json::Value,
    /// Requested job control mode. Defaults to the process's own preference
    /// when omitted: sync if supported, otherwise async.
    #[serde(default)]
    pub mode: Option<ExecutionMode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ExecutionMode {
    Sync,
    Async,
}

/// Response body for a synchronously completed job.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ExecutionCompleted {
    pub job_id: String,
    pub status: JobStatusName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<serde_json::Value>,
}

/// Response body for an accepted (queued or running async) job.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ExecutionAccepted {
    pub job_id: String,
    pub status: JobStatusName,
}

/// A degenerate HTML-format response: SEPEX does not render HTML itself, so
/// an `Accept: text/html` (or `?f=html`) caller gets the same data wrapped
/// in a note explaining that JSON is all that's actually produced.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct HtmlFallback<T> {
    pub message: &'static str,
    #[serde(flatten)]
    pub data: T,
}

impl<T> HtmlFallback<T> {
    pub fn wrap(data: T) -> Self {
        Self {
            message: "HTML rendering is not implemented by this deployment; returning JSON",
            data,
        }
    }
}

/// `JobStatus` re-exposed with its own schema, since the domain enum is not
/// schema-derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatusName {
    Accepted,
    Running,
    Successful,
    Failed,
    Dismissed,
}

impl From<JobStatus> for JobStatusName {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Accepted => Self::Accepted,
            JobStatus::Running => Self::Running,
            JobStatus::Successful => Self::Successful,
            JobStatus::Failed => Self::Failed,
            JobStatus::Dismissed => Self::Dismissed,
        }
    }
}

/// `GET /jobs/{jobID}` response body.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct JobStatusInfo {
    pub job_id: String,
    pub process_id: String,
    pub status: JobStatusName,
    pub started: Option<String>,
    pub finished: Option<String>,
    pub updated: String,
}

/// `GET /jobs/{jobID}/logs` response body.
#[derive(Debug, Clone, Default, Serialize, JsonSchema)]
pub struct JobLogs {
    pub process_logs: Vec<serde_json::Value>,
    pub server_logs: Vec<serde_json::Value>,
}

/// `GET /admin/resources` response body.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ResourcesView {
    pub total: ResourceRequestView,
    pub used: ResourceRequestView,
    pub queued: ResourceRequestView,
    pub pending_count: usize,
    pub active_count: usize,
}

#[derive(Debug, Clone, Copy, Serialize, JsonSchema)]
pub struct ResourceRequestView {
    pub cpus: f64,
    pub memory_mb: u64,
}

impl From<ResourceRequest> for ResourceRequestView {
    fn from(request: ResourceRequest) -> Self {
        Self {
            cpus: request.cpus,
            memory_mb: request.memory_mb,
        }
    }
}

/// `GET /healthz` response body.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct HealthView {
    pub status: HealthStatusName,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_ms: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatusName {
    Healthy,
    Degraded,
    Unhealthy,
}

impl From<ServiceStatus> for HealthStatusName {
    fn from(status: ServiceStatus) -> Self {
        match status {
            ServiceStatus::Healthy => Self::Healthy,
            ServiceStatus::Degraded => Self::Degraded,
            ServiceStatus::Unhealthy => Self::Unhealthy,
        }
    }
}

impl From<ServiceHealth> for HealthView {
    fn from(health: ServiceHealth) -> Self {
        Self {
            status: health.status.into(),
            message: health.message,
            response_ms: health.response.map(|d| d.as_millis() as u64),
        }
    }
}
