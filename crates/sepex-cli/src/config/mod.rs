//! CLI configuration management.
//!
//! This module defines the complete CLI configuration hierarchy:
//!
//! ```text
//! Cli
//! ├── server: ServerConfig         # Host, port, TLS, shutdown
//! ├── middleware: MiddlewareConfig # CORS, OpenAPI, recovery/timeouts
//! ├── resources: ResourceConfig    # Local CPU/memory ceiling
//! ├── paths: PathsConfig           # Plugin/log directories, storage prefixes
//! ├── identity: IdentityConfig     # Repo URL, deployment name
//! └── storage: StorageConfig       # Object-storage backend selection
//! ```
//!
//! All configuration can be provided via CLI arguments or environment
//! variables. Use `--help` to see all available options.

mod middleware;
mod server;

use anyhow::Context;
use clap::Parser;
pub use middleware::MiddlewareConfig;
use sepex_server::service::{IdentityConfig, PathsConfig, ResourceConfig, ServiceConfig, StorageConfig};
use serde::{Deserialize, Serialize};
pub use server::{log_server_config, ServerConfig};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "sepex")]
#[command(about = "OGC API Processes-compliant job scheduling server")]
#[command(version)]
pub struct Cli {
    /// Server network and lifecycle configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// HTTP middleware configuration (CORS, OpenAPI, timeouts).
    #[clap(flatten)]
    pub middleware: MiddlewareConfig,

    /// Local CPU/memory ceiling for container and subprocess jobs.
    #[clap(flatten)]
    pub resources: ResourceConfig,

    /// Plugin directory, job log directory, and storage key prefixes.
    #[clap(flatten)]
    pub paths: PathsConfig,

    /// Deployment identity surfaced in OpenAPI docs and job metadata.
    #[clap(flatten)]
    pub identity: IdentityConfig,

    /// Object-storage backend for uploaded job metadata/results.
    #[clap(flatten)]
    pub storage: StorageConfig,
}

impl Cli {
    /// Loads environment variables from a `.env` file (if the `dotenv`
    /// feature is enabled) and parses CLI arguments.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                eprintln!("warning: failed to load .env file: {err}");
            }
        }
    }

    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server.validate().context("invalid server configuration")?;
        Ok(())
    }

    /// Builds the [`ServiceConfig`] `sepex-server` needs from the flattened
    /// CLI groups.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            resources: self.resources.clone(),
            paths: self.paths.clone(),
            identity: self.identity.clone(),
            storage: self.storage.clone(),
        }
    }
}
