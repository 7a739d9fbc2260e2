//! Middleware for `axum::Router` and HTTP request processing.
//!
//! Each middleware category has its own extension trait for ergonomic
//! composition. There is no authentication layer: SEPEX is deployed behind
//! a trusted boundary and does not authenticate callers itself.
//!
//! # Middleware Ordering
//!
//! Axum applies layers in reverse order, so the last layer added wraps the
//! outermost request handling. From outermost to innermost:
//!
//! 1. **Recovery** - catches panics and enforces timeouts.
//! 2. **Observability** - request IDs and tracing spans.
//! 3. **Security** - CORS, security headers, compression, body limits.
//! 4. **Metrics** - categorized request timing.
//!
//! # Example
//!
//! ```rust
//! use axum::Router;
//! use sepex_server::middleware::{
//!     RouterObservabilityExt, RouterRecoveryExt, RouterSecurityExt,
//! };
//!
//! fn layer(router: Router) -> Router {
//!     router
//!         .with_metrics()             // 4. Metrics
//!         .with_default_security()    // 3. Security
//!         .with_observability()       // 2. Observability
//!         .with_default_recovery()    // 1. Recovery (outermost)
//! }
//! ```

mod observability;
mod recovery;
mod security;
mod specification;

pub use observability::RouterObservabilityExt;
pub use recovery::{RecoveryConfig, RouterRecoveryExt};
pub use security::{
    CorsConfig, FrameOptions, ReferrerPolicy, RouterSecurityExt, SecurityHeadersConfig,
};
pub use specification::{OpenApiConfig, RouterOpenApiExt};
