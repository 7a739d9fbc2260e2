//! Job lifecycle handlers (`/jobs/*`).
//!
//! A job's authoritative state lives on its [`JobHandle`] only while it is
//! still tracked by [`ActiveJobs`]; once `job::run` closes it, the finisher
//! persists a [`JobRecord`] to `JobStore` and uploads logs/results/metadata
//! to `BlobStore` under the key scheme `finisher.rs` writes them with. Every
//! handler here checks `ActiveJobs` first and falls back to the durable
//! copy, so a status/logs/results poll keeps working after a job finishes.

use std::sync::Arc;

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sepex_core::dispatcher::Dispatcher;
use sepex_core::model::{JobId, JobStatus};
use sepex_core::traits::{BlobStore, JobStore};
use sepex_core::ActiveJobs;

use crate::error::{ErrorKind, Result};
use crate::handler::dto::{JobLogs, JobStatusInfo};
use crate::service::{PathsConfig, ServiceState};
use crate::utility::tracing_targets;

fn parse_job_id(raw: &str) -> Result<JobId> {
    raw.parse()
        .map_err(|_| ErrorKind::BadRequest.with_message("job id must be a UUID"))
}

async fn get_job_status(
    State(active_jobs): State<Arc<ActiveJobs>>,
    State(job_store): State<Arc<dyn JobStore>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusInfo>> {
    let job_id = parse_job_id(&job_id)?;

    if let Some(job) = active_jobs.get(job_id) {
        return Ok(Json(JobStatusInfo {
            job_id: job.id().to_string(),
            process_id: job.process_id().to_string(),
            status: job.status().into(),
            started: job.started_at().map(|t| t.to_string()),
            finished: job.ended_at().map(|t| t.to_string()),
            updated: job.update_time().to_string(),
        }));
    }

    let record = job_store
        .get(job_id)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.with_resource("job"))?;

    Ok(Json(JobStatusInfo {
        job_id: record.job_id.to_string(),
        process_id: record.process_id,
        status: record.status.into(),
        started: record.started_at.map(|t| t.to_string()),
        finished: record.ended_at.map(|t| t.to_string()),
        updated: record.update_time.to_string(),
    }))
}

fn get_job_status_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Get job status")
        .description("Returns the current lifecycle status of a submitted job.")
        .response::<200, Json<JobStatusInfo>>()
        .response::<404, Json<crate::error::ErrorBody>>()
}

/// Reads one of a job's two log streams, preferring the local copy the
/// finisher retains for `log_retention` after upload, then falling back to
/// the object-storage copy once the local file has aged out.
async fn read_log_stream(
    paths: &PathsConfig,
    blob_store: &dyn BlobStore,
    job_id: JobId,
    stream: &str,
) -> Vec<serde_json::Value> {
    let file_name = format!("{job_id}.{stream}.jsonl");
    let local_path = paths.tmp_job_logs_dir.join(&file_name);

    let bytes = match tokio::fs::read(&local_path).await {
        Ok(bytes) => Some(bytes),
        Err(_) => {
            let key = format!(
                "{}/logs/{}",
                paths.storage_metadata_prefix.trim_end_matches('/'),
                file_name
            );
            blob_store.get(&key).await.ok()
        }
    };

    let Some(bytes) = bytes else {
        return Vec::new();
    };

    String::from_utf8_lossy(&bytes)
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

async fn get_job_logs(
    State(paths): State<Arc<PathsConfig>>,
    State(blob_store): State<Arc<dyn BlobStore>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobLogs>> {
    let job_id = parse_job_id(&job_id)?;

    let process_logs = read_log_stream(&paths, blob_store.as_ref(), job_id, "process").await;
    let server_logs = read_log_stream(&paths, blob_store.as_ref(), job_id, "server").await;

    Ok(Json(JobLogs {
        process_logs,
        server_logs,
    }))
}

fn get_job_logs_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Get job logs")
        .description("Returns the process and server JSONL logs captured for a job.")
        .response::<200, Json<JobLogs>>()
}

async fn get_job_results(
    State(active_jobs): State<Arc<ActiveJobs>>,
    State(job_store): State<Arc<dyn JobStore>>,
    State(paths): State<Arc<PathsConfig>>,
    State(blob_store): State<Arc<dyn BlobStore>>,
    Path(job_id): Path<String>,
) -> Result<Json<Option<serde_json::Value>>> {
    let job_id = parse_job_id(&job_id)?;

    if let Some(job) = active_jobs.get(job_id) {
        return Ok(Json(job.results()));
    }

    job_store
        .get(job_id)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.with_resource("job"))?;

    let key = format!(
        "{}/{}.json",
        paths.storage_results_prefix.trim_end_matches('/'),
        job_id
    );
    let results = match blob_store.get(&key).await {
        Ok(bytes) => Some(
            serde_json::from_slice(&bytes)
                .map_err(|err| ErrorKind::InternalServerError.with_message(err.to_string()))?,
        ),
        Err(_) => None,
    };

    Ok(Json(results))
}

fn get_job_results_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Get job results")
        .description(
            "Returns the `plugin_results` value parsed from the job's last stdout JSONL \
            record. `null` if the job produced no results.",
        )
        .response::<200, Json<Option<serde_json::Value>>>()
        .response::<404, Json<crate::error::ErrorBody>>()
}

async fn get_job_metadata(
    State(active_jobs): State<Arc<ActiveJobs>>,
    State(job_store): State<Arc<dyn JobStore>>,
    State(paths): State<Arc<PathsConfig>>,
    State(blob_store): State<Arc<dyn BlobStore>>,
    Path(job_id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let job_id = parse_job_id(&job_id)?;

    let status = if let Some(job) = active_jobs.get(job_id) {
        job.status()
    } else {
        job_store
            .get(job_id)
            .await?
            .ok_or_else(|| ErrorKind::NotFound.with_resource("job"))?
            .status
    };

    if status != JobStatus::Successful {
        return Err(ErrorKind::Conflict
            .with_message("job metadata is only available once a job has completed successfully"));
    }

    let key = format!(
        "{}/{}.json",
        paths.storage_metadata_prefix.trim_end_matches('/'),
        job_id
    );
    let bytes = blob_store
        .get(&key)
        .await
        .map_err(|_| ErrorKind::NotFound.with_resource("job metadata"))?;
    let value = serde_json::from_slice(&bytes)
        .map_err(|err| ErrorKind::InternalServerError.with_message(err.to_string()))?;

    Ok(Json(value))
}

fn get_job_metadata_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Get job metadata")
        .description("Returns the JSON-LD metadata document published for a successfully completed job.")
        .response::<200, Json<serde_json::Value>>()
        .response::<404, Json<crate::error::ErrorBody>>()
        .response::<409, Json<crate::error::ErrorBody>>()
}

async fn dismiss_job(
    State(dispatcher): State<Arc<Dispatcher>>,
    Path(job_id): Path<String>,
) -> Result<StatusCode> {
    let job_id = parse_job_id(&job_id)?;
    dispatcher.dismiss(job_id).await?;
    tracing::info!(target: tracing_targets::JOBS, job_id = %job_id, "job dismissed");
    Ok(StatusCode::NO_CONTENT)
}

fn dismiss_job_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Dismiss a job")
        .description("Cancels a non-terminal job: removes it from the pending queue if still queued, otherwise signals its cancellation token.")
        .response::<204, ()>()
        .response::<400, Json<crate::error::ErrorBody>>()
}

pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route(
            "/jobs/{jobId}",
            get_with(get_job_status, get_job_status_docs)
                .delete_with(dismiss_job, dismiss_job_docs),
        )
        .api_route("/jobs/{jobId}/logs", get_with(get_job_logs, get_job_logs_docs))
        .api_route(
            "/jobs/{jobId}/results",
            get_with(get_job_results, get_job_results_docs),
        )
        .api_route(
            "/jobs/{jobId}/metadata",
            get_with(get_job_metadata, get_job_metadata_docs),
        )
        .with_path_items(|item| item.tag("Jobs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_job_id_rejects_non_uuid() {
        assert!(parse_job_id("not-a-uuid").is_err());
    }

    #[test]
    fn parse_job_id_accepts_uuid() {
        let id = JobId::generate();
        assert_eq!(parse_job_id(&id.to_string()).unwrap(), id);
    }
}
