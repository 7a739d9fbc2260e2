//! Resource accounting for the local job scheduler.
//!
//! `used` drives admission; `queued` is purely observational (exposed at
//! `/admin/resources`) and never gates a [`try_reserve`](ResourcePool::try_reserve)
//! call. Keeping the two separate avoids double-counting a job's resources
//! once it moves from queued to running.

use std::sync::Mutex;

use tracing::Instrument;

use crate::model::ResourceRequest;

/// Tracing target for resource-pool accounting.
const TRACING_TARGET: &str = "sepex_core::resource_pool";

#[derive(Debug, Clone, Copy, Default)]
struct ResourceCounters {
    used: ResourceRequest,
    queued: ResourceRequest,
}

/// Tracks available/used/queued CPU and memory for locally scheduled jobs.
///
/// Mutation only ever happens through `try_reserve`/`release`/`add_queued`/
/// `remove_queued` — there is no other way to touch the counters, which is
/// what lets the admission invariant (`used <= total`, always) hold.
pub struct ResourcePool {
    total: ResourceRequest,
    counters: Mutex<ResourceCounters>,
    release_signal: tokio::sync::Notify,
}

/// Point-in-time snapshot of pool accounting, as exposed by `/admin/resources`.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct ResourcePoolSnapshot {
    pub total: ResourceRequest,
    pub used: ResourceRequest,
    pub queued: ResourceRequest,
}

impl ResourcePool {
    /// Creates a pool with the given host-wide ceiling.
    pub fn new(total: ResourceRequest) -> Self {
        Self {
            total,
            counters: Mutex::new(ResourceCounters::default()),
            release_signal: tokio::sync::Notify::new(),
        }
    }

    /// Atomic check-and-commit: returns `true` and commits `used += r` iff
    /// `used + r <= total`. Leaves counters untouched on `false`.
    #[tracing::instrument(target = "sepex_core::resource_pool", skip(self), fields(cpus = request.cpus, memory_mb = request.memory_mb))]
    pub fn try_reserve(&self, request: ResourceRequest) -> bool {
        let mut counters = self.counters.lock().expect("resource pool lock poisoned");
        let next_cpus = counters.used.cpus + request.cpus;
        let next_mem = counters.used.memory_mb + request.memory_mb;
        if next_cpus > self.total.cpus || next_mem > self.total.memory_mb {
            tracing::debug!(target: TRACING_TARGET, "reservation denied: insufficient resources");
            return false;
        }
        counters.used.cpus = next_cpus;
        counters.used.memory_mb = next_mem;
        tracing::debug!(target: TRACING_TARGET, used_cpus = counters.used.cpus, used_mb = counters.used.memory_mb, "reservation granted");
        true
    }

    /// Releases a previously reserved amount. An undershoot (releasing more
    /// than is currently used) is clamped to zero rather than panicking or
    /// wrapping, but is logged loudly — it indicates a double-release defect
    /// upstream (see [`ErrorKind::InternalInvariantViolation`](crate::ErrorKind::InternalInvariantViolation)).
    ///
    /// Every call, including clamped ones, wakes the scheduler exactly once
    /// via the coalescing release signal.
    pub fn release(&self, request: ResourceRequest) {
        let mut counters = self.counters.lock().expect("resource pool lock poisoned");
        let double_release = request.cpus > counters.used.cpus || request.memory_mb > counters.used.memory_mb;
        counters.used = counters.used - request;
        drop(counters);

        if double_release {
            tracing::error!(
                target: TRACING_TARGET,
                cpus = request.cpus,
                memory_mb = request.memory_mb,
                "release exceeded tracked usage; clamped to zero (double-release defect)"
            );
        } else {
            tracing::debug!(target: TRACING_TARGET, cpus = request.cpus, memory_mb = request.memory_mb, "released reservation");
        }

        self.release_signal.notify_one();
    }

    /// Advisory: records that a request has entered the pending queue.
    /// Never consulted by `try_reserve`.
    pub fn add_queued(&self, request: ResourceRequest) {
        let mut counters = self.counters.lock().expect("resource pool lock poisoned");
        counters.queued = counters.queued + request;
    }

    /// Advisory: records that a request has left the pending queue, whether
    /// because it started running or was dismissed. Callers must invoke this
    /// on *every* path that removes a job from the pending queue.
    pub fn remove_queued(&self, request: ResourceRequest) {
        let mut counters = self.counters.lock().expect("resource pool lock poisoned");
        counters.queued = counters.queued - request;
    }

    /// A coalescing wakeup: multiple `release` calls between two polls
    /// collapse into a single notification, mirroring a capacity-1 buffered
    /// channel. The scheduler drains the pending queue to exhaustion on
    /// every wakeup, so coalescing never causes a missed admission.
    pub async fn notified(&self) {
        self.release_signal.notified().instrument(tracing::trace_span!("resource_pool_wait")).await
    }

    /// Point-in-time snapshot for the admin resource view.
    pub fn snapshot(&self) -> ResourcePoolSnapshot {
        let counters = self.counters.lock().expect("resource pool lock poisoned");
        ResourcePoolSnapshot {
            total: self.total,
            used: counters.used,
            queued: counters.queued,
        }
    }

    pub fn total(&self) -> ResourceRequest {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_succeeds_up_to_total() {
        let pool = ResourcePool::new(ResourceRequest::new(1.0, 512));
        assert!(pool.try_reserve(ResourceRequest::new(1.0, 512)));
        assert!(!pool.try_reserve(ResourceRequest::new(0.001, 0)));
    }

    #[test]
    fn reserve_leaves_counters_untouched_on_failure() {
        let pool = ResourcePool::new(ResourceRequest::new(1.0, 512));
        assert!(pool.try_reserve(ResourceRequest::new(0.5, 256)));
        assert!(!pool.try_reserve(ResourceRequest::new(1.0, 256)));
        let snap = pool.snapshot();
        assert_eq!(snap.used, ResourceRequest::new(0.5, 256));
    }

    #[test]
    fn release_unblocks_subsequent_reservation() {
        let pool = ResourcePool::new(ResourceRequest::new(1.0, 512));
        assert!(pool.try_reserve(ResourceRequest::new(1.0, 512)));
        pool.release(ResourceRequest::new(1.0, 512));
        assert!(pool.try_reserve(ResourceRequest::new(1.0, 512)));
    }

    #[test]
    fn double_release_clamps_to_zero_instead_of_underflowing() {
        let pool = ResourcePool::new(ResourceRequest::new(1.0, 512));
        pool.release(ResourceRequest::new(1.0, 512));
        let snap = pool.snapshot();
        assert_eq!(snap.used, ResourceRequest::zero());
    }

    #[test]
    fn queued_counter_is_advisory_and_never_gates_admission() {
        let pool = ResourcePool::new(ResourceRequest::new(1.0, 512));
        pool.add_queued(ResourceRequest::new(5.0, 9999));
        assert!(pool.try_reserve(ResourceRequest::new(1.0, 512)));
    }

    #[tokio::test]
    async fn release_notifies_a_waiter() {
        let pool = ResourcePool::new(ResourceRequest::new(1.0, 512));
        assert!(pool.try_reserve(ResourceRequest::new(1.0, 512)));

        let notified = pool.notified();
        pool.release(ResourceRequest::new(1.0, 512));
        notified.await;
    }
}
