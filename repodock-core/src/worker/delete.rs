//! Delete worker

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use super::{JobOutcome, Worker, WorkerFailure};
use crate::catalog::Catalog;
use crate::git::remove_repo;
use crate::job::{JobKind, ProvisioningJob, QueuedJob};
use crate::name::RepositoryName;
use crate::oplog::OperationLog;
use crate::Result;

/// Removes repositories from disk and from the catalog
///
/// Removing something that is already gone is a no-op, so duplicate
/// deliveries and deletes of unknown names succeed.
pub struct DeleteWorker {
    repos_root: PathBuf,
    catalog: Arc<dyn Catalog>,
    log: OperationLog,
}

impl DeleteWorker {
    pub fn new(
        repos_root: impl Into<PathBuf>,
        catalog: Arc<dyn Catalog>,
        log_dir: &Path,
    ) -> Result<Self> {
        Ok(Self {
            repos_root: repos_root.into(),
            catalog,
            log: OperationLog::new(log_dir, JobKind::Delete.log_file())?,
        })
    }

    async fn delete(&self, name: &RepositoryName) -> Result<String> {
        let path = name.path_in(&self.repos_root);

        let removed_dir = remove_repo(&path).await?;
        let removed_entry = self.catalog.remove(name).await?;

        Ok(if removed_dir || removed_entry {
            format!("Deleted {}", name)
        } else {
            format!("{} does not exist, nothing to delete", name)
        })
    }

    fn record(&self, message: &str) {
        if let Err(e) = self.log.append(message) {
            tracing::warn!(
                log = %self.log.path().display(),
                error = %e,
                "Failed to write operation log"
            );
        }
    }
}

#[async_trait]
impl Worker for DeleteWorker {
    fn kind(&self) -> JobKind {
        JobKind::Delete
    }

    async fn run(&self, queued: &QueuedJob) -> JobOutcome {
        let ProvisioningJob::Delete { name } = &queued.job else {
            return JobOutcome::Failed(WorkerFailure::WrongKind {
                id: queued.id,
                kind: queued.job.kind(),
            });
        };

        tracing::info!(job_id = queued.id, name = %name, "Deleting repository");
        self.record(&format!("Deleting {}", name));

        match self.delete(name).await {
            Ok(message) => {
                self.record(&message);
                JobOutcome::Succeeded(message)
            }
            Err(e) => {
                tracing::warn!(job_id = queued.id, name = %name, error = %e, "Delete failed");
                self.record(&format!("Failed to delete {}: {}", name, e));
                JobOutcome::Failed(WorkerFailure::Operation(e.to_string()))
            }
        }
    }
}
