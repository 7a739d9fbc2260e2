//! Application state and dependency injection.
//!
//! Wires every scheduling primitive together exactly once at startup,
//! following the donor's `impl_di!` pattern: each collaborator is a field on
//! `ServiceState` and gets its own [`axum::extract::FromRef`] impl so handlers
//! can extract only the pieces they need via [`axum::extract::State`].

use std::sync::Arc;

use sepex_core::{ActiveJobs, Dispatcher, PendingJobs, ResourcePool, Scheduler};
use sepex_core::dispatcher::BackendFactory;
use sepex_core::job::JobDeps;
use sepex_core::model::ResourceRequest;
use sepex_core::runtime::{DockerCliContainerRuntime, InMemoryJobStore, TokioProcessRuntime};
use sepex_core::status_bus::{StatusBus, StatusBusWorkers};
use sepex_core::traits::{AsyncBackend, BlobStore, ContainerRuntime, JobStore, ProcessRuntime};
use sepex_storage::OpendalBlobStore;

use crate::service::config::{IdentityConfig, PathsConfig, ResourceConfig, StorageConfig};
use crate::service::health::HealthCache;
use crate::service::process_registry::ProcessRegistry;
use crate::service::unsupported_async_backend::UnsupportedAsyncBackend;

/// Full configuration needed to build a [`ServiceState`].
pub struct ServiceConfig {
    pub resources: ResourceConfig,
    pub paths: PathsConfig,
    pub identity: IdentityConfig,
    pub storage: StorageConfig,
}

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Clone)]
pub struct ServiceState {
    dispatcher: Arc<Dispatcher>,
    resource_pool: Arc<ResourcePool>,
    pending_jobs: Arc<PendingJobs>,
    active_jobs: Arc<ActiveJobs>,
    scheduler: Arc<Scheduler>,
    process_registry: Arc<ProcessRegistry>,
    health_cache: HealthCache,
    identity: Arc<IdentityConfig>,
    paths: Arc<PathsConfig>,
    blob_store: Arc<dyn BlobStore>,
    job_store: Arc<dyn JobStore>,
}

impl ServiceState {
    /// Initializes application state from configuration.
    ///
    /// Loads the process registry from disk, builds the local execution
    /// substrates, and spawns the status bus and scheduler background tasks.
    /// Returns the join handles for those tasks alongside the state so the
    /// caller's shutdown sequence can await their drain.
    pub async fn from_config(
        config: &ServiceConfig,
    ) -> anyhow::Result<(Self, StatusBusWorkers, tokio::task::JoinHandle<()>)> {
        let limits = config.resources.resource_limits();
        let process_registry =
            Arc::new(ProcessRegistry::load_from_dir(&config.paths.plugins_dir, &limits).await?);

        let pool = Arc::new(ResourcePool::new(ResourceRequest::new(
            limits.max_cpus,
            limits.max_memory_mb,
        )));
        let pending = Arc::new(PendingJobs::new());
        let active_jobs = Arc::new(ActiveJobs::new());

        let (status_bus, workers) = StatusBus::spawn(Arc::clone(&active_jobs));

        let blob_store: Arc<dyn BlobStore> =
            Arc::new(OpendalBlobStore::new(&config.storage.to_opendal_config()?)?);
        let job_store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());

        let deps = Arc::new(JobDeps {
            status_bus: Arc::clone(&status_bus),
            job_store: Arc::clone(&job_store),
            blob_store: Arc::clone(&blob_store),
            metadata_prefix: config.paths.storage_metadata_prefix.clone(),
            results_prefix: config.paths.storage_results_prefix.clone(),
            log_dir: config.paths.tmp_job_logs_dir.clone(),
            log_retention: config.paths.log_retention(),
            context_url: config.identity.context_url(),
        });

        let scheduler = Scheduler::new(Arc::clone(&pending), Arc::clone(&pool), Arc::clone(&deps));
        let scheduler_join = Arc::clone(&scheduler).spawn();

        let backends = BackendFactory {
            container_runtime: Arc::new(DockerCliContainerRuntime::new()) as Arc<dyn ContainerRuntime>,
            process_runtime: Arc::new(TokioProcessRuntime::new()) as Arc<dyn ProcessRuntime>,
            async_backend: Arc::new(UnsupportedAsyncBackend) as Arc<dyn AsyncBackend>,
        };

        let dispatcher = Arc::new(Dispatcher::new(
            limits,
            Arc::clone(&pool),
            Arc::clone(&pending),
            Arc::clone(&scheduler),
            Arc::clone(&active_jobs),
            deps,
            backends,
        ));

        let state = Self {
            dispatcher,
            resource_pool: pool,
            pending_jobs: pending,
            active_jobs,
            scheduler,
            process_registry,
            health_cache: HealthCache::new(),
            identity: Arc::new(config.identity.clone()),
            paths: Arc::new(config.paths.clone()),
            blob_store,
            job_store,
        };

        Ok((state, workers, scheduler_join))
    }

    /// A token that resolves once the scheduler has been asked to shut down,
    /// consulted by the health cache and the CLI's shutdown sequence.
    pub fn scheduler_shutdown_token(&self) -> tokio_util::sync::CancellationToken {
        self.scheduler.shutdown_token()
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

impl_di!(dispatcher: Arc<Dispatcher>);
impl_di!(resource_pool: Arc<ResourcePool>);
impl_di!(pending_jobs: Arc<PendingJobs>);
impl_di!(active_jobs: Arc<ActiveJobs>);
impl_di!(scheduler: Arc<Scheduler>);
impl_di!(process_registry: Arc<ProcessRegistry>);
impl_di!(health_cache: HealthCache);
impl_di!(identity: Arc<IdentityConfig>);
impl_di!(paths: Arc<PathsConfig>);
impl_di!(blob_store: Arc<dyn BlobStore>);
impl_di!(job_store: Arc<dyn JobStore>);
