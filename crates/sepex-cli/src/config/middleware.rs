//! Middleware configuration for the HTTP server.
//!
//! CORS, OpenAPI, and recovery settings are all re-exported from
//! `sepex-server` and are independently clap-derivable; this struct just
//! groups them under one flattened CLI surface.

use clap::Args;
use sepex_server::middleware::{CorsConfig, OpenApiConfig, RecoveryConfig};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    #[clap(flatten)]
    pub cors: CorsConfig,

    #[clap(flatten)]
    pub openapi: OpenApiConfig,

    #[clap(flatten)]
    pub recovery: RecoveryConfig,
}
