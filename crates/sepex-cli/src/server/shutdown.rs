//! Graceful shutdown: signal handling and the scheduler/job drain sequence.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use sepex_core::status_bus::StatusBusWorkers;
use sepex_core::{ActiveJobs, Dispatcher, Scheduler};
use sepex_server::ServiceState;
use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix;
use tokio::task::JoinHandle;

use crate::TRACING_TARGET_SHUTDOWN;

/// Waits for a shutdown signal (SIGTERM or SIGINT/Ctrl+C).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = ctrl_c().await {
            tracing::error!(target: TRACING_TARGET_SHUTDOWN, error = %err, "failed to install Ctrl+C handler");
        } else {
            tracing::info!(target: TRACING_TARGET_SHUTDOWN, "received Ctrl+C, initiating graceful shutdown");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match unix::signal(unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                tracing::info!(target: TRACING_TARGET_SHUTDOWN, "received SIGTERM, initiating graceful shutdown");
            }
            Err(err) => {
                tracing::error!(target: TRACING_TARGET_SHUTDOWN, error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

/// Drains the scheduler and every active job once the HTTP listener has
/// stopped accepting connections and in-flight requests have completed.
///
/// Stops the scheduler's drain loop, dismisses every non-terminal active
/// job, waits (bounded by `timeout`) for their `Close` paths to empty
/// `ActiveJobs`, then joins the scheduler task and the status bus's two
/// consumer tasks so no message is left unflushed when the process exits.
pub async fn drain(state: ServiceState, workers: StatusBusWorkers, scheduler_join: JoinHandle<()>, timeout: Duration) {
    let scheduler = Arc::<Scheduler>::from_ref(&state);
    scheduler.shutdown();

    let active_jobs = Arc::<ActiveJobs>::from_ref(&state);
    let dispatcher = Arc::<Dispatcher>::from_ref(&state);

    let snapshot = active_jobs.snapshot();
    tracing::info!(
        target: TRACING_TARGET_SHUTDOWN,
        active_jobs = snapshot.len(),
        "dismissing active jobs for shutdown"
    );

    for job in snapshot {
        if job.status().is_terminal() {
            continue;
        }
        if let Err(err) = dispatcher.dismiss(job.id()).await {
            tracing::warn!(
                target: TRACING_TARGET_SHUTDOWN,
                job_id = %job.id(),
                error = %err,
                "failed to dismiss job during shutdown"
            );
        }
    }

    let wait_drained = async {
        while !active_jobs.is_empty() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    };

    if tokio::time::timeout(timeout, wait_drained).await.is_err() {
        tracing::warn!(
            target: TRACING_TARGET_SHUTDOWN,
            remaining = active_jobs.len(),
            "shutdown timeout elapsed with jobs still active"
        );
    }

    if tokio::time::timeout(timeout, scheduler_join).await.is_err() {
        tracing::warn!(target: TRACING_TARGET_SHUTDOWN, "scheduler task did not exit within shutdown timeout");
    }

    drop(dispatcher);
    drop(active_jobs);
    drop(scheduler);
    drop(state);

    if tokio::time::timeout(timeout, workers.status_worker).await.is_err() {
        tracing::warn!(target: TRACING_TARGET_SHUTDOWN, "status bus worker did not drain within shutdown timeout");
    }
    if tokio::time::timeout(timeout, workers.done_worker).await.is_err() {
        tracing::warn!(target: TRACING_TARGET_SHUTDOWN, "done worker did not drain within shutdown timeout");
    }

    tracing::info!(target: TRACING_TARGET_SHUTDOWN, "shutdown sequence complete");
}
