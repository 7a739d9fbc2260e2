#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! HTTP transport for the SEPEX scheduling core.
//!
//! Wires [`sepex_core`]'s scheduling primitives behind an [`aide`]-annotated
//! `axum` router: process discovery and execution, job lifecycle, operator
//! resource introspection, and the ambient health/OpenAPI surface. The
//! scheduling logic itself — admission, the state machine, the queue worker
//! — lives entirely in `sepex-core`; this crate only exposes it over HTTP.

pub mod error;
pub mod extract;
pub mod handler;
pub mod middleware;
pub mod service;
pub mod utility;

pub use handler::routes;
pub use service::{ServiceConfig, ServiceState};
