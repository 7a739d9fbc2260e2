#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;

use std::process;

use anyhow::Context;
use axum::Router;
use sepex_server::middleware::{
    RouterObservabilityExt, RouterOpenApiExt, RouterRecoveryExt, RouterSecurityExt, SecurityHeadersConfig,
};
use sepex_server::{ServiceConfig, ServiceState};

use crate::config::{log_server_config, Cli, MiddlewareConfig};

/// Tracing target for startup/listener lifecycle events.
pub const TRACING_TARGET_STARTUP: &str = "sepex_cli::server::startup";
/// Tracing target for shutdown and scheduler-drain events.
pub const TRACING_TARGET_SHUTDOWN: &str = "sepex_cli::server::shutdown";
/// Tracing target for resolved configuration.
pub const TRACING_TARGET_CONFIG: &str = "sepex_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(target: TRACING_TARGET_SHUTDOWN, "application terminated successfully");
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(target: TRACING_TARGET_SHUTDOWN, error = %error, "application terminated with error");
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    init_tracing();
    log_startup_info();
    log_server_config(&cli.server);

    cli.validate()?;

    log_middleware_config(&cli.middleware);

    let (state, workers, scheduler_join) = create_service_state(&cli.service_config()).await?;
    let router = create_router(state.clone(), &cli.middleware);

    server::serve(router, &cli.server, state, workers, scheduler_join).await?;

    Ok(())
}

/// Loads the process registry, wires the scheduling core, and spawns its
/// background tasks.
async fn create_service_state(
    config: &ServiceConfig,
) -> anyhow::Result<(ServiceState, sepex_core::status_bus::StatusBusWorkers, tokio::task::JoinHandle<()>)> {
    ServiceState::from_config(config)
        .await
        .context("failed to create service state")
}

/// Composes the API router: OpenAPI docs, then security, observability, and
/// recovery middleware layered outermost-to-innermost.
fn create_router(state: ServiceState, middleware: &MiddlewareConfig) -> Router {
    let api: Router<ServiceState> = sepex_server::routes().with_open_api(middleware.openapi.clone());
    let router: Router = api.with_state(state);

    router
        .with_metrics()
        .with_security(&middleware.cors, &SecurityHeadersConfig::default())
        .with_observability()
        .with_recovery(&middleware.recovery)
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn log_startup_info() {
    tracing::info!(target: TRACING_TARGET_STARTUP, version = env!("CARGO_PKG_VERSION"), "starting sepex server");

    tracing::debug!(
        target: TRACING_TARGET_STARTUP,
        pid = process::id(),
        arch = std::env::consts::ARCH,
        os = std::env::consts::OS,
        features = ?enabled_features(),
        "build information"
    );
}

fn log_middleware_config(config: &MiddlewareConfig) {
    tracing::info!(
        target: TRACING_TARGET_CONFIG,
        cors_origins = ?config.cors.allowed_origins,
        cors_credentials = config.cors.allow_credentials,
        openapi_path = %config.openapi.open_api_json,
        scalar_path = %config.openapi.scalar_ui,
        request_timeout_secs = config.recovery.request_timeout,
        "middleware configuration"
    );
}

fn enabled_features() -> Vec<&'static str> {
    [
        cfg!(feature = "tls").then_some("tls"),
        cfg!(feature = "otel").then_some("otel"),
        cfg!(feature = "dotenv").then_some("dotenv"),
    ]
    .into_iter()
    .flatten()
    .collect()
}
