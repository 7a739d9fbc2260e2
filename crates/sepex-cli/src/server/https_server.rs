//! HTTPS server startup using rustls, with the same drain sequence as
//! [`super::http_server::serve_http`].

use std::path::Path;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use sepex_core::status_bus::StatusBusWorkers;
use sepex_server::extract::AppConnectInfo;
use sepex_server::ServiceState;
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::server::shutdown::{drain, shutdown_signal};
use crate::server::{ServerError, ServerResult};
use crate::TRACING_TARGET_STARTUP;

pub async fn serve_https(
    app: Router,
    server_config: &ServerConfig,
    cert_path: &Path,
    key_path: &Path,
    state: ServiceState,
    workers: StatusBusWorkers,
    scheduler_join: JoinHandle<()>,
) -> ServerResult<()> {
    let server_addr = server_config.server_addr();
    let shutdown_timeout = server_config.shutdown_timeout();

    validate_tls_files(cert_path, key_path)?;

    let tls_config = RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(|err| ServerError::TlsCertificate(err.to_string()))?;

    tracing::info!(target: TRACING_TARGET_STARTUP, addr = %server_addr, tls = true, "server listening");

    let handle = axum_server::Handle::new();
    let shutdown_handle = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_handle.graceful_shutdown(Some(shutdown_timeout));
    });

    axum_server::bind_rustls(server_addr, tls_config)
        .handle(handle)
        .serve(app.into_make_service_with_connect_info::<AppConnectInfo>())
        .await
        .map_err(ServerError::Runtime)?;

    tracing::info!(target: TRACING_TARGET_STARTUP, "listener closed, draining scheduler");
    drain(state, workers, scheduler_join, shutdown_timeout).await;

    Ok(())
}

fn validate_tls_files(cert_path: &Path, key_path: &Path) -> ServerResult<()> {
    let validate_file = |path: &Path| -> ServerResult<()> {
        if !path.is_file() {
            return Err(ServerError::TlsCertificate(format!(
                "{} does not exist or is not a file",
                path.display()
            )));
        }
        Ok(())
    };

    validate_file(cert_path)?;
    validate_file(key_path)
}
