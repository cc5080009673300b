//! CLI command implementations

pub mod request;
pub mod serve;
pub mod status;
pub mod worker;

use std::sync::Arc;

use repodock_core::{ActivityReporter, Config, RepoHandles};
use repodock_db::{Database, SqliteCatalog, SqliteJobQueue};

pub use request::RequestArgs;
pub use serve::ServeArgs;
pub use status::{LogArgs, ReposArgs, StatusArgs};
pub use worker::WorkerArgs;

/// Queue and catalog backed by the configured database
pub(crate) struct Backends {
    pub queue: Arc<SqliteJobQueue>,
    pub catalog: Arc<SqliteCatalog>,
}

impl Backends {
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let db = Database::new(&config.storage.database_path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to open database: {}", e))?;

        Ok(Self {
            queue: Arc::new(db.job_queue()),
            catalog: Arc::new(db.catalog()),
        })
    }

    pub fn reporter(&self, config: &Config) -> ActivityReporter {
        ActivityReporter::new(
            self.queue.clone(),
            self.catalog.clone(),
            Arc::new(RepoHandles::new()),
            &config.storage.repos_root,
            &config.storage.log_dir,
            config.reporter.clone(),
        )
    }
}

/// Resolves on Ctrl-C
pub(crate) async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
