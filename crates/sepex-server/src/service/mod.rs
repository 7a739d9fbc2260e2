//! Application state, configuration, and the collaborators wired into them.

mod config;
mod health;
mod process_registry;
mod state;
mod unsupported_async_backend;

pub use config::{
    IdentityConfig, PathsConfig, ResourceConfig, StorageBackendKind, StorageConfig,
};
pub use health::HealthCache;
pub use process_registry::ProcessRegistry;
pub use state::{ServiceConfig, ServiceState};
