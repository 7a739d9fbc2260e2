//! Commonly used items from sepex-core.
//!
//! Exports the handful of types a `sepex-server` handler or `sepex-cli`
//! startup path needs without reaching into every submodule individually.

pub use crate::active_jobs::ActiveJobs;
pub use crate::dispatcher::{DispatchOutcome, DispatchRequest, Dispatcher, ExecutionPreference};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::job::{JobBackend, JobDeps, JobHandle};
pub use crate::model::{
    HostType, JobControlOption, JobId, JobStatus, OutputTransmission, ProcessSpec,
    ResourceLimits, ResourceRequest,
};
pub use crate::pending_jobs::PendingJobs;
pub use crate::resource_pool::ResourcePool;
pub use crate::runtime::{DockerCliContainerRuntime, InMemoryJobStore, TokioProcessRuntime};
pub use crate::scheduler::Scheduler;
pub use crate::status_bus::StatusBus;
pub use crate::traits::{AsyncBackend, BlobStore, ContainerRuntime, JobStore, ProcessRuntime};
