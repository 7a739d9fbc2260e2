//! Test doubles for the `sepex-core` collaborator traits.
//!
//! Each mock records enough call history for a test to assert on behavior,
//! not just outcomes, and every failure mode is opt-in via its `*Config`
//! struct rather than hardcoded.

mod async_backend;
mod blob_store;
mod container;
mod job_store;
mod process;

pub use async_backend::{MockAsyncBackend, MockAsyncBackendConfig, MockTerminalState};
pub use blob_store::MockBlobStore;
pub use container::{MockContainerConfig, MockContainerRuntime};
pub use job_store::MockJobStore;
pub use process::{MockProcessConfig, MockProcessHandle, MockProcessRuntime};
