#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod active_jobs;
mod common;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod model;
pub mod pending_jobs;
#[doc(hidden)]
pub mod prelude;
pub mod resource_pool;
pub mod runtime;
pub mod scheduler;
pub mod status_bus;
pub mod traits;

pub use active_jobs::ActiveJobs;
pub use common::{ServiceHealth, ServiceStatus, Timing};
pub use dispatcher::Dispatcher;
pub use error::{BoxedError, Error, ErrorKind, Result};
pub use pending_jobs::PendingJobs;
pub use resource_pool::ResourcePool;
pub use scheduler::Scheduler;
pub use status_bus::StatusBus;
