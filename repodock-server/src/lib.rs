//! repodock server - admin HTTP API
//!
//! Exposes the provisioning dispatcher and activity reporter over HTTP. The
//! surrounding application is responsible for authenticating admin users;
//! these routes perform no access control of their own.

pub mod api;

use std::sync::Arc;

use repodock_core::{ActivityReporter, Catalog, Config, Dispatcher, JobQueue, RepoHandles};

pub use api::create_router;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub reporter: Arc<ActivityReporter>,
}

impl AppState {
    /// Wire the dispatcher and reporter to the given queue and catalog
    pub fn new(queue: Arc<dyn JobQueue>, catalog: Arc<dyn Catalog>, config: &Config) -> Self {
        let dispatcher = Dispatcher::new(queue.clone(), &config.storage.repos_root);
        let reporter = ActivityReporter::new(
            queue,
            catalog,
            Arc::new(RepoHandles::new()),
            &config.storage.repos_root,
            &config.storage.log_dir,
            config.reporter.clone(),
        );

        Self {
            dispatcher: Arc::new(dispatcher),
            reporter: Arc::new(reporter),
        }
    }
}
