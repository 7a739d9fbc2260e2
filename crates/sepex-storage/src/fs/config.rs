//! Local filesystem configuration, for single-node deployments that don't
//! need an object store.

use serde::{Deserialize, Serialize};

/// Local filesystem-backed storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FsConfig {
    /// Root directory all keys are resolved relative to.
    pub root: String,
}

impl FsConfig {
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }
}
