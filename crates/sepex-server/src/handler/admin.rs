//! Operator routes for resource and queue introspection (`/admin/*`).

use std::sync::Arc;

use aide::axum::ApiRouter;
use aide::transform::TransformOperation;
use axum::extract::State;
use axum::Json;
use sepex_core::{ActiveJobs, PendingJobs, ResourcePool};

use crate::handler::dto::ResourcesView;
use crate::service::ServiceState;

/// Reads `ResourcePool` then `PendingJobs`, the fixed lock order the rest of
/// the scheduling core uses, so concurrent admission can't be observed
/// half-reflected in this snapshot.
async fn get_resources(
    State(pool): State<Arc<ResourcePool>>,
    State(pending): State<Arc<PendingJobs>>,
    State(active_jobs): State<Arc<ActiveJobs>>,
) -> Json<ResourcesView> {
    let snapshot = pool.snapshot();
    let pending_count = pending.len();
    let active_count = active_jobs.len();

    Json(ResourcesView {
        total: snapshot.total.into(),
        used: snapshot.used.into(),
        queued: snapshot.queued.into(),
        pending_count,
        active_count,
    })
}

fn get_resources_docs(op: TransformOperation) -> TransformOperation {
    op.summary("Get resource usage")
        .description(
            "Returns a point-in-time snapshot of the CPU/memory budget, the advisory queued \
            total, and the pending/active job counts.",
        )
        .response::<200, Json<ResourcesView>>()
}

pub fn routes() -> ApiRouter<ServiceState> {
    use aide::axum::routing::*;

    ApiRouter::new()
        .api_route("/admin/resources", get_with(get_resources, get_resources_docs))
        .with_path_items(|item| item.tag("Admin"))
}
