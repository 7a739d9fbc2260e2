//! Utility modules for common functionality across the crate.

mod constants;
pub mod route_category;
pub mod tracing_targets;

pub use constants::{DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_FILE_BODY_SIZE};
pub use route_category::RouteCategory;
