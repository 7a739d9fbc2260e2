//! CPU/memory quantities used by admission and the resource pool.

use serde::{Deserialize, Serialize};

/// A resource request or reservation amount.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub cpus: f64,
    pub memory_mb: u64,
}

impl ResourceRequest {
    pub fn new(cpus: f64, memory_mb: u64) -> Self {
        Self { cpus, memory_mb }
    }

    pub const fn zero() -> Self {
        Self {
            cpus: 0.0,
            memory_mb: 0,
        }
    }
}

impl std::ops::Add for ResourceRequest {
    type Output = ResourceRequest;

    fn add(self, rhs: Self) -> Self::Output {
        ResourceRequest {
            cpus: self.cpus + rhs.cpus,
            memory_mb: self.memory_mb + rhs.memory_mb,
        }
    }
}

impl std::ops::Sub for ResourceRequest {
    type Output = ResourceRequest;

    /// Saturating subtraction; callers use this for `Release`, where an
    /// undershoot below zero indicates a double-release defect and is
    /// clamped rather than panicking or wrapping.
    fn sub(self, rhs: Self) -> Self::Output {
        ResourceRequest {
            cpus: (self.cpus - rhs.cpus).max(0.0),
            memory_mb: self.memory_mb.saturating_sub(rhs.memory_mb),
        }
    }
}

/// The host-wide ceiling a [`ResourcePool`](crate::resource_pool::ResourcePool)
/// enforces, and against which a [`ProcessSpec`](crate::model::ProcessSpec)'s
/// declared `maxResources` is validated at load.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceLimits {
    pub max_cpus: f64,
    pub max_memory_mb: u64,
}

impl ResourceLimits {
    pub fn new(max_cpus: f64, max_memory_mb: u64) -> Self {
        Self {
            max_cpus,
            max_memory_mb,
        }
    }

    /// Default CPU ceiling: 0.8 x host logical CPU count, per the
    /// `MAX_LOCAL_CPUS` configuration default.
    pub fn default_max_cpus(host_cpus: usize) -> f64 {
        host_cpus as f64 * 0.8
    }

    pub fn permits(&self, request: ResourceRequest) -> bool {
        request.cpus <= self.max_cpus && request.memory_mb <= self.max_memory_mb
    }
}
