//! Lightweight reference implementations of the opaque external-collaborator
//! traits in [`crate::traits`], suitable for a single-node deployment.
//!
//! None of these are part of the scheduling core's contract (see §1's
//! "Out of scope" list) — a deployment is free to swap any of them for a
//! real Docker daemon client, a Kubernetes batch driver, or a persistent
//! store without touching `sepex-core`'s scheduling logic.

mod container;
mod job_store;
mod process;

pub use container::DockerCliContainerRuntime;
pub use job_store::InMemoryJobStore;
pub use process::TokioProcessRuntime;
