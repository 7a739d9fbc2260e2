//! Observability middleware for monitoring, tracing, and metrics.
//!
//! Generates request IDs, adds tracing spans, and logs categorized request
//! timing against the thresholds in [`RouteCategory`](crate::utility::RouteCategory).

use std::time::Instant;

use axum::Router;
use axum::extract::{ConnectInfo, Request};
use axum::http::header;
use axum::middleware::{Next, from_fn};
use axum::response::Response;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::trace::TraceLayer;

use crate::extract::AppConnectInfo;
use crate::utility::route_category::PerformanceThresholds;
use crate::utility::{RouteCategory, tracing_targets};

/// Extension trait for `axum::`[`Router`] to apply observability middleware.
pub trait RouterObservabilityExt<S> {
    /// Layers request ID generation, propagation, and tracing.
    fn with_observability(self) -> Self;

    /// Layers categorized request metrics logging.
    fn with_metrics(self) -> Self;
}

impl<S> RouterObservabilityExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_observability(self) -> Self {
        self.layer(PropagateRequestIdLayer::new(header::HeaderName::from_static(
            "x-request-id",
        )))
        .layer(SetSensitiveRequestHeadersLayer::new([header::COOKIE]))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(
            header::HeaderName::from_static("x-request-id"),
            MakeRequestUuid,
        ))
    }

    fn with_metrics(self) -> Self {
        self.layer(ServiceBuilder::new().layer(from_fn(track_categorized_metrics)))
    }
}

/// Request metrics middleware with route categorization and timing.
pub async fn track_categorized_metrics(
    ConnectInfo(connect_info): ConnectInfo<AppConnectInfo>,
    request: Request,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let category = RouteCategory::from_uri(&uri);
    let client_ip = connect_info.client_ip();

    tracing::trace!(
        target: tracing_targets::METRICS,
        method = %method,
        uri = %uri,
        category = category.as_str(),
        client_ip = %client_ip,
        "request started"
    );

    let response = next.run(request).await;
    let duration = start_time.elapsed();
    let duration_ms = duration.as_millis() as u64;
    let thresholds = PerformanceThresholds::for_category(&category);
    let status = response.status();

    if duration_ms >= thresholds.error_ms {
        tracing::error!(
            target: tracing_targets::METRICS,
            method = %method,
            uri = %uri,
            category = category.as_str(),
            status = %status,
            duration_ms,
            client_ip = %client_ip,
            "request exceeded error threshold"
        );
    } else if duration_ms >= thresholds.warn_ms {
        tracing::warn!(
            target: tracing_targets::METRICS,
            method = %method,
            uri = %uri,
            category = category.as_str(),
            status = %status,
            duration_ms,
            client_ip = %client_ip,
            "request exceeded warning threshold"
        );
    } else {
        tracing::trace!(
            target: tracing_targets::METRICS,
            method = %method,
            uri = %uri,
            category = category.as_str(),
            status = %status,
            duration_ms,
            client_ip = %client_ip,
            "request completed"
        );
    }

    response
}
