//! HTTP server startup and shutdown orchestration.

use axum::Router;
use sepex_core::status_bus::StatusBusWorkers;
use sepex_server::extract::AppConnectInfo;
use sepex_server::ServiceState;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::server::shutdown::{drain, shutdown_signal};
use crate::server::{ServerError, ServerResult};
use crate::TRACING_TARGET_STARTUP;

/// Binds and serves the router, then runs the scheduler/job drain sequence
/// once the listener has stopped accepting connections.
pub async fn serve_http(
    app: Router,
    server_config: &ServerConfig,
    state: ServiceState,
    workers: StatusBusWorkers,
    scheduler_join: JoinHandle<()>,
) -> ServerResult<()> {
    let server_addr = server_config.server_addr();
    let shutdown_timeout = server_config.shutdown_timeout();

    let listener = TcpListener::bind(server_addr)
        .await
        .map_err(|err| ServerError::bind_error(&server_addr.to_string(), err))?;

    tracing::info!(target: TRACING_TARGET_STARTUP, addr = %server_addr, "server listening");

    let app = app.into_make_service_with_connect_info::<AppConnectInfo>();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Runtime)?;

    tracing::info!(target: TRACING_TARGET_STARTUP, "listener closed, draining scheduler");
    drain(state, workers, scheduler_join, shutdown_timeout).await;

    Ok(())
}

#[cfg(test)]
mod tests {}
