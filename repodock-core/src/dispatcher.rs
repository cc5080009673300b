//! Provisioning dispatcher
//!
//! Turns operator requests into queued jobs. The dispatcher validates
//! against the filesystem but never changes it; all mutation happens in the
//! workers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ValidationError;
use crate::job::{ProvisioningJob, QueuedJob};
use crate::name::{RepositoryName, RepositorySource};
use crate::queue::JobQueue;
use crate::Result;

/// Accepts clone and delete requests
pub struct Dispatcher {
    queue: Arc<dyn JobQueue>,
    repos_root: PathBuf,
}

impl Dispatcher {
    pub fn new(queue: Arc<dyn JobQueue>, repos_root: impl Into<PathBuf>) -> Self {
        Self {
            queue,
            repos_root: repos_root.into(),
        }
    }

    pub fn repos_root(&self) -> &Path {
        &self.repos_root
    }

    /// Schedule a clone of `source_url`
    ///
    /// The name conflict check is advisory: two requests for the same name
    /// can both pass it, and the clone worker rejects the loser.
    pub async fn request_clone(&self, source_url: &str) -> Result<QueuedJob> {
        let source = RepositorySource::parse(source_url)?;
        let name = source.derive_name()?;

        if name.path_in(&self.repos_root).exists() {
            return Err(ValidationError::NameConflict {
                name: name.to_string(),
                root: self.repos_root.clone(),
            }
            .into());
        }

        let queued = self
            .queue
            .enqueue(ProvisioningJob::Clone {
                name: name.clone(),
                source,
            })
            .await?;

        tracing::info!(job_id = queued.id, name = %name, "Clone requested");
        Ok(queued)
    }

    /// Schedule removal of the repository `name`
    ///
    /// Unknown names are enqueued too; the delete worker treats them as a
    /// no-op.
    pub async fn request_delete(&self, name: &str) -> Result<QueuedJob> {
        let name = RepositoryName::new(name)?;

        let queued = self
            .queue
            .enqueue(ProvisioningJob::Delete { name: name.clone() })
            .await?;

        tracing::info!(job_id = queued.id, name = %name, "Delete requested");
        Ok(queued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobKind;
    use crate::queue::MemoryJobQueue;
    use tempfile::TempDir;

    fn dispatcher(root: &Path) -> (Arc<MemoryJobQueue>, Dispatcher) {
        let queue = Arc::new(MemoryJobQueue::new());
        let dispatcher = Dispatcher::new(queue.clone(), root);
        (queue, dispatcher)
    }

    #[tokio::test]
    async fn test_clone_enqueues_exactly_one_job() {
        let temp = TempDir::new().unwrap();
        let (queue, dispatcher) = dispatcher(temp.path());

        let queued = dispatcher
            .request_clone("https://github.com/acme/foo.git")
            .await
            .unwrap();

        assert_eq!(queue.len().unwrap(), 1);
        match queued.job {
            ProvisioningJob::Clone { name, source } => {
                assert_eq!(name.as_str(), "foo");
                assert_eq!(source.as_str(), "https://github.com/acme/foo.git");
            }
            other => panic!("unexpected job: {:?}", other),
        }

        let pending = queue.peek(JobKind::Clone, 0, 25).await.unwrap();
        assert_eq!(pending.len(), 1);
        // nothing touches the filesystem before a worker runs
        assert!(!temp.path().join("foo").exists());
    }

    #[tokio::test]
    async fn test_invalid_url_never_enqueues() {
        let temp = TempDir::new().unwrap();
        let (queue, dispatcher) = dispatcher(temp.path());

        for url in ["", "   ", "not a url", "https://example.com"] {
            let err = dispatcher.request_clone(url).await.unwrap_err();
            assert!(
                matches!(err.as_validation(), Some(ValidationError::InvalidInput(_))),
                "{:?} gave {:?}",
                url,
                err
            );
        }

        assert!(queue.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_name_conflict_never_enqueues() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("foo")).unwrap();
        let (queue, dispatcher) = dispatcher(temp.path());

        let err = dispatcher
            .request_clone("https://github.com/acme/foo.git")
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            format!(
                "There is already a folder named \"foo\" in {}.",
                temp.path().display()
            )
        );
        assert!(queue.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_delete_always_enqueues() {
        let temp = TempDir::new().unwrap();
        let (queue, dispatcher) = dispatcher(temp.path());

        dispatcher.request_delete("never-existed").await.unwrap();

        let pending = queue.peek(JobKind::Delete, 0, 25).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].job.name().as_str(), "never-existed");
    }

    #[tokio::test]
    async fn test_delete_rejects_traversal() {
        let temp = TempDir::new().unwrap();
        let (queue, dispatcher) = dispatcher(temp.path());

        let err = dispatcher.request_delete("../etc").await.unwrap_err();
        assert!(matches!(
            err.as_validation(),
            Some(ValidationError::PathTraversal(_))
        ));

        let err = dispatcher.request_delete("").await.unwrap_err();
        assert!(matches!(
            err.as_validation(),
            Some(ValidationError::InvalidInput(_))
        ));

        assert!(queue.is_empty().unwrap());
    }
}
