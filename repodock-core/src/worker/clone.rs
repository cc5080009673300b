//! Clone worker

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use super::{JobOutcome, Worker, WorkerFailure};
use crate::catalog::{Catalog, CatalogEntry, IngestionState};
use crate::error::ValidationError;
use crate::git::{clone_repo, remove_repo, GitRepo};
use crate::job::{JobId, JobKind, ProvisioningJob, QueuedJob};
use crate::name::{RepositoryName, RepositorySource};
use crate::oplog::OperationLog;
use crate::Result;

/// Directory under the repository root holding in-flight clones
pub const STAGING_DIR: &str = ".cloning";

/// Clones repositories into the repository root
pub struct CloneWorker {
    repos_root: PathBuf,
    catalog: Arc<dyn Catalog>,
    log: OperationLog,
}

impl CloneWorker {
    pub fn new(
        repos_root: impl Into<PathBuf>,
        catalog: Arc<dyn Catalog>,
        log_dir: &Path,
    ) -> Result<Self> {
        Ok(Self {
            repos_root: repos_root.into(),
            catalog,
            log: OperationLog::new(log_dir, JobKind::Clone.log_file())?,
        })
    }

    /// Staging directory for one delivery of a job
    ///
    /// Each delivery gets its own directory, so a redelivered job never
    /// touches a clone another runner is still writing.
    fn staging_path(&self, name: &RepositoryName, id: JobId) -> PathBuf {
        self.repos_root.join(STAGING_DIR).join(format!(
            "{}.{}.{}",
            name,
            id,
            uuid::Uuid::new_v4().simple()
        ))
    }

    async fn clone_into_place(
        &self,
        id: JobId,
        name: &RepositoryName,
        source: &RepositorySource,
    ) -> Result<JobOutcome> {
        let target = name.path_in(&self.repos_root);

        if tokio::fs::symlink_metadata(&target).await.is_ok() {
            return self.check_existing(name, source, &target).await;
        }

        let staging = self.staging_path(name, id);

        if let Err(e) = clone_repo(source, &staging).await {
            discard_staging(&staging).await;
            return Ok(JobOutcome::Failed(WorkerFailure::Operation(e.to_string())));
        }

        if let Err(e) = tokio::fs::rename(&staging, &target).await {
            discard_staging(&staging).await;
            // another delivery may have moved its clone into place first
            if tokio::fs::symlink_metadata(&target).await.is_ok() {
                return self.check_existing(name, source, &target).await;
            }
            return Ok(JobOutcome::Failed(WorkerFailure::Operation(format!(
                "Failed to move clone into {}: {}",
                target.display(),
                e
            ))));
        }

        self.catalog
            .upsert(&CatalogEntry::new(name.clone(), &target, IngestionState::Cloned))
            .await?;

        Ok(JobOutcome::Succeeded(format!(
            "Cloned {} into {}",
            source,
            target.display()
        )))
    }

    /// Decide what an existing target path means for this job
    ///
    /// A repository whose origin is this job's source was put there by an
    /// earlier delivery of the same job, or found by a root scan. An entry
    /// already in the catalog keeps its state.
    async fn check_existing(
        &self,
        name: &RepositoryName,
        source: &RepositorySource,
        target: &Path,
    ) -> Result<JobOutcome> {
        let origin = GitRepo::open(target).ok().and_then(|repo| repo.origin_url());

        if origin.as_deref() != Some(source.as_str()) {
            let conflict = ValidationError::NameConflict {
                name: name.to_string(),
                root: self.repos_root.clone(),
            };
            return Ok(JobOutcome::Failed(WorkerFailure::Conflict(conflict.to_string())));
        }

        if self.catalog.get(name).await?.is_none() {
            self.catalog
                .upsert(&CatalogEntry::new(name.clone(), target, IngestionState::Cloned))
                .await?;
        }

        Ok(JobOutcome::Succeeded(format!(
            "{} already present at {}",
            name,
            target.display()
        )))
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

async fn discard_staging(staging: &Path) {
    if let Err(e) = remove_repo(staging).await {
        tracing::warn!(path = %staging.display(), error = %e, "Failed to remove staging directory");
    }
}

#[async_trait]
impl Worker for CloneWorker {
    fn kind(&self) -> JobKind {
        JobKind::Clone
    }

    async fn run(&self, queued: &QueuedJob) -> JobOutcome {
        let ProvisioningJob::Clone { name, source } = &queued.job else {
            return JobOutcome::Failed(WorkerFailure::WrongKind {
                id: queued.id,
                kind: queued.job.kind(),
            });
        };

        tracing::info!(job_id = queued.id, name = %name, source = %source, "Cloning repository");
        self.record(&format!("Cloning {} as {}", source, name));

        let outcome = match self.clone_into_place(queued.id, name, source).await {
            Ok(outcome) => outcome,
            Err(e) => JobOutcome::Failed(WorkerFailure::Operation(e.to_string())),
        };

        match &outcome {
            JobOutcome::Succeeded(message) => {
                tracing::info!(job_id = queued.id, name = %name, "{}", message);
                self.record(message);
            }
            JobOutcome::Failed(failure) => {
                tracing::warn!(job_id = queued.id, name = %name, error = %failure, "Clone failed");
                self.record(&format!("Failed to clone {}: {}", name, failure));
            }
        }

        outcome
    }
}
