//! Liveness/readiness probe (`/healthz`).

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use sepex_core::ServiceStatus;

use crate::handler::dto::HealthView;
use crate::service::{HealthCache, ProcessRegistry, ServiceState};

async fn get_health(
    State(state): State<ServiceState>,
    State(health_cache): State<HealthCache>,
    State(registry): State<std::sync::Arc<ProcessRegistry>>,
) -> (StatusCode, Json<HealthView>) {
    let shutdown = state.scheduler_shutdown_token();
    let health = health_cache.is_healthy(&shutdown, &registry).await;

    let status = match health.status {
        ServiceStatus::Healthy | ServiceStatus::Degraded => StatusCode::OK,
        ServiceStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(HealthView::from(health)))
}

fn get_health_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Liveness and readiness probe")
        .description(
            "Reports whether the scheduler loop is running and at least one process is \
            registered, cached for a short TTL to stay cheap under polling.",
        )
        .response::<200, Json<HealthView>>()
        .response::<503, Json<HealthView>>()
}

pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route("/healthz", get_with(get_health, get_health_docs))
        .with_path_items(|item| item.tag("Health"))
}
