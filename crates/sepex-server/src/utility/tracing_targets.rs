//! Centralized tracing target constants for structured logging.
//!
//! Using consistent targets enables fine-grained control over log output
//! via tracing subscriber filters.

/// Request metrics and performance monitoring.
pub const METRICS: &str = "sepex_server::metrics";

/// Error recovery including middleware errors and request failures.
pub const RECOVERY_ERROR: &str = "sepex_server::recovery::error";

/// Panic recovery including handler panics and service failures.
pub const RECOVERY_PANIC: &str = "sepex_server::recovery::panic";

/// Process execution requests accepted or rejected by the dispatcher.
pub const EXECUTION: &str = "sepex_server::handler::execution";

/// Job lifecycle operations: status lookups, result retrieval, dismiss.
pub const JOBS: &str = "sepex_server::handler::jobs";

/// Operator-facing resource and queue introspection.
pub const ADMIN: &str = "sepex_server::handler::admin";

/// Liveness/readiness probe checks.
pub const HEALTH: &str = "sepex_server::handler::health";
