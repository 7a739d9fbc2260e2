//! Detached post-completion work: persisting the job record, uploading logs,
//! and eventually deleting the local copies.
//!
//! Runs after `Close` so it never blocks a caller polling job status, but is
//! tracked via [`JobHandle::track_side_task`] so graceful shutdown can still
//! wait for metadata/log uploads to finish before the process exits.

use std::sync::Arc;

use crate::job::{JobDeps, JobHandle};
use crate::model::{ImageRef, JobMetadata, JobRecord, ProcessRef};

const TRACING_TARGET: &str = "sepex_core::job::finisher";

pub(super) fn spawn_finisher(job: JobHandle, deps: Arc<JobDeps>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(err) = write_metadata(&job, &deps).await {
            tracing::warn!(target: TRACING_TARGET, job_id = %job.id(), error = %err, "failed to persist job metadata");
        }
        if let Err(err) = upload_logs(&job, &deps).await {
            tracing::warn!(target: TRACING_TARGET, job_id = %job.id(), error = %err, "failed to upload job logs");
        }
        // Local log retention runs independently of shutdown: losing the
        // timer on process exit just leaves a stale temp file behind, which
        // is harmless, so this task is intentionally left untracked.
        tokio::spawn(delete_logs_after_retention(job, deps));
    })
}

async fn write_metadata(job: &JobHandle, deps: &JobDeps) -> crate::error::Result<()> {
    let record = JobRecord {
        job_id: job.id(),
        process_id: job.process_id().to_string(),
        process_version: job.process_version().to_string(),
        submitter: job.submitter().map(str::to_string),
        status: job.status(),
        update_time: job.update_time(),
        provider_id: job.provider_id(),
        command: job.command().to_vec(),
        env_vars: job.env_vars().to_vec(),
        volumes: job.volumes().to_vec(),
        resources: job.resources(),
        is_sync: job.is_sync(),
        started_at: job.started_at(),
        ended_at: job.ended_at(),
    };

    deps.job_store.put(record).await?;

    // Only successful jobs get a JSON-LD metadata document per §4.6; a
    // failed or dismissed job has no meaningful results/provenance to
    // publish, and its `JobRecord` is still queryable via `JobStore`.
    if job.status() == crate::model::JobStatus::Successful {
        let metadata = JobMetadata {
            context: deps.context_url.clone(),
            job_id: job.id(),
            process: ProcessRef {
                id: job.process_id().to_string(),
                version: job.process_version().to_string(),
            },
            image: job.image().map(|reference| ImageRef {
                reference: reference.to_string(),
                digest: job.image_digest(),
            }),
            commands: job.command().to_vec(),
            generated_at: jiff::Timestamp::now(),
            started_at: job.started_at(),
            ended_at: job.ended_at(),
        };

        let key = format!("{}/{}.json", deps.metadata_prefix.trim_end_matches('/'), job.id());
        let bytes = serde_json::to_vec(&metadata)
            .map_err(|err| crate::error::Error::auxiliary("failed to serialize job metadata").with_source(err))?;
        deps.blob_store.put(&key, "application/json", bytes).await?;
    }

    if let Some(results) = job.results() {
        let results_key = format!("{}/{}.json", deps.results_prefix.trim_end_matches('/'), job.id());
        let bytes = serde_json::to_vec(&results)
            .map_err(|err| crate::error::Error::auxiliary("failed to serialize job results").with_source(err))?;
        deps.blob_store.put(&results_key, "application/json", bytes).await?;
    }

    Ok(())
}

fn log_paths(job: &JobHandle, deps: &JobDeps) -> Vec<std::path::PathBuf> {
    vec![
        deps.log_dir.join(format!("{}.process.jsonl", job.id())),
        deps.log_dir.join(format!("{}.server.jsonl", job.id())),
    ]
}

async fn upload_logs(job: &JobHandle, deps: &JobDeps) -> crate::error::Result<()> {
    for path in log_paths(job, deps) {
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => {
                return Err(crate::error::Error::auxiliary(format!(
                    "failed to read log file {}",
                    path.display()
                ))
                .with_source(err));
            }
        };
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let key = format!("{}/logs/{}", deps.metadata_prefix.trim_end_matches('/'), file_name);
        deps.blob_store.put(&key, "application/x-ndjson", bytes).await?;
    }
    Ok(())
}

async fn delete_logs_after_retention(job: JobHandle, deps: Arc<JobDeps>) {
    tokio::time::sleep(deps.log_retention).await;
    for path in log_paths(&job, &deps) {
        if let Err(err) = tokio::fs::remove_file(&path).await {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::debug!(target: TRACING_TARGET, job_id = %job.id(), path = %path.display(), error = %err, "failed to delete retained log file");
            }
        }
    }
}
