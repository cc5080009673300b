//! Activity reporter
//!
//! Read-only view of provisioning activity for operators: pending and
//! running clones from the job queue, tails of the operation logs, and the
//! catalogued repositories that are actually present on disk.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::catalog::{scan_for_new_repos, Catalog, IngestionState, RepoHandles};
use crate::config::ReporterConfig;
use crate::git::CommitSummary;
use crate::job::JobKind;
use crate::name::RepositoryName;
use crate::oplog::{log_path, tail_file};
use crate::queue::JobQueue;
use crate::Result;

/// Log written by the commit fetcher, shown on the overview
pub const FETCH_LOG: &str = "fetch_commits.log";

/// A catalogued repository that resolves on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositorySummary {
    pub name: RepositoryName,
    pub path: PathBuf,
    pub state: IngestionState,
    pub latest_commit: Option<CommitSummary>,
}

/// Clone jobs waiting for and held by workers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CloningStatus {
    pub pending: Vec<RepositoryName>,
    pub in_progress: Vec<RepositoryName>,
}

/// Everything the repository admin page shows
#[derive(Debug, Clone, Serialize)]
pub struct ActivityOverview {
    pub repositories: Vec<RepositorySummary>,
    #[serde(flatten)]
    pub cloning: CloningStatus,
    pub clone_log: Vec<String>,
    pub fetch_log: Vec<String>,
}

pub struct ActivityReporter {
    queue: Arc<dyn JobQueue>,
    catalog: Arc<dyn Catalog>,
    handles: Arc<RepoHandles>,
    repos_root: PathBuf,
    log_dir: PathBuf,
    config: ReporterConfig,
}

impl ActivityReporter {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        catalog: Arc<dyn Catalog>,
        handles: Arc<RepoHandles>,
        repos_root: impl Into<PathBuf>,
        log_dir: impl Into<PathBuf>,
        config: ReporterConfig,
    ) -> Self {
        Self {
            queue,
            catalog,
            handles,
            repos_root: repos_root.into(),
            log_dir: log_dir.into(),
            config,
        }
    }

    /// Names of pending clone jobs in queue order, up to the peek limit
    ///
    /// Jobs already claimed by a worker are not pending; see
    /// [`Self::list_clones_in_progress`].
    pub async fn list_repositories_being_cloned(&self) -> Result<Vec<RepositoryName>> {
        let pending = self
            .queue
            .peek(JobKind::Clone, 0, self.config.peek_limit)
            .await?;

        Ok(pending.into_iter().map(|q| q.job.name().clone()).collect())
    }

    /// Names of clone jobs a worker is executing right now
    pub async fn list_clones_in_progress(&self) -> Result<Vec<RepositoryName>> {
        let running = self.queue.in_progress(JobKind::Clone).await?;
        Ok(running.into_iter().map(|q| q.job.name().clone()).collect())
    }

    pub async fn cloning_status(&self) -> Result<CloningStatus> {
        Ok(CloningStatus {
            pending: self.list_repositories_being_cloned().await?,
            in_progress: self.list_clones_in_progress().await?,
        })
    }

    /// Last `line_count` lines of an operation log
    ///
    /// `log_name` must be a bare file name inside the log directory.
    pub fn tail_log(&self, log_name: &str, line_count: usize) -> Result<Vec<String>> {
        let path = log_path(&self.log_dir, log_name)?;
        tail_file(&path, line_count.min(self.config.log_tail_lines))
    }

    /// Catalogued repositories with their latest commit
    ///
    /// Entries whose directory is gone or no longer opens as a repository are
    /// left out.
    pub async fn list_cataloged_repositories(&self) -> Result<Vec<RepositorySummary>> {
        let entries = self.catalog.list().await?;
        let mut summaries = Vec::with_capacity(entries.len());

        for entry in entries {
            let Some(latest) = self
                .handles
                .with_handle(&entry, |repo| repo.latest_commit())
            else {
                continue;
            };

            let latest_commit = latest.unwrap_or_else(|e| {
                tracing::warn!(name = %entry.name, error = %e, "Failed to read latest commit");
                None
            });

            summaries.push(RepositorySummary {
                name: entry.name,
                path: entry.path,
                state: entry.state,
                latest_commit,
            });
        }

        Ok(summaries)
    }

    /// Data for the repository admin page
    ///
    /// Registers untracked repositories under the root before listing.
    pub async fn overview(&self) -> Result<ActivityOverview> {
        if let Err(e) = scan_for_new_repos(&self.repos_root, self.catalog.as_ref()).await {
            tracing::warn!(error = %e, "Repository root scan failed");
        }

        let lines = self.config.overview_tail_lines;
        Ok(ActivityOverview {
            repositories: self.list_cataloged_repositories().await?,
            cloning: self.cloning_status().await?,
            clone_log: self.tail_log(JobKind::Clone.log_file(), lines)?,
            fetch_log: self.tail_log(FETCH_LOG, lines)?,
        })
    }
}
