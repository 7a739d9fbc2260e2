//! HTTP(S) server startup, dispatched by TLS configuration.

mod error;
mod http_server;
#[cfg(feature = "tls")]
mod https_server;
mod shutdown;

use axum::Router;
pub use error::{ServerError, ServerResult};
use sepex_core::status_bus::StatusBusWorkers;
use sepex_server::ServiceState;
use tokio::task::JoinHandle;

use crate::config::ServerConfig;

/// Starts the server with the appropriate protocol.
///
/// Starts HTTPS when both TLS paths are configured (feature `tls`),
/// otherwise starts plain HTTP. Either path runs the scheduler/job drain
/// sequence once the listener stops accepting connections.
pub async fn serve(
    app: Router,
    server_config: &ServerConfig,
    state: ServiceState,
    workers: StatusBusWorkers,
    scheduler_join: JoinHandle<()>,
) -> ServerResult<()> {
    #[cfg(feature = "tls")]
    {
        if let (Some(cert_path), Some(key_path)) =
            (server_config.tls_cert_path.as_deref(), server_config.tls_key_path.as_deref())
        {
            tracing::info!(target: crate::TRACING_TARGET_STARTUP, "starting HTTPS server");
            return https_server::serve_https(
                app,
                server_config,
                cert_path,
                key_path,
                state,
                workers,
                scheduler_join,
            )
            .await;
        }
    }

    tracing::info!(target: crate::TRACING_TARGET_STARTUP, "starting HTTP server");
    http_server::serve_http(app, server_config, state, workers, scheduler_join).await
}
