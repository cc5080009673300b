//! Git repository cloning and removal

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use git2::build::RepoBuilder;

use crate::name::RepositorySource;
use crate::{Error, Result};

/// Clone `source` into `target`
///
/// `target` must not exist yet. The clone runs on the blocking thread pool.
pub async fn clone_repo(source: &RepositorySource, target: &Path) -> Result<PathBuf> {
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::Other(format!("Failed to create clone directory: {}", e)))?;
    }

    let url = source.as_str().to_string();
    let target = target.to_path_buf();

    tokio::task::spawn_blocking(move || {
        RepoBuilder::new()
            .clone(&url, &target)
            .map(|_| target)
            .map_err(|e| classify_clone_error(&url, e))
    })
    .await
    .map_err(|e| Error::Other(format!("Clone task failed: {}", e)))?
}

/// Turn a libgit2 failure into an operator-readable error
fn classify_clone_error(url: &str, err: git2::Error) -> Error {
    match (err.class(), err.code()) {
        (_, git2::ErrorCode::Auth) => Error::Other(format!(
            "Authentication failed for {}. Check your credentials or repository access.",
            url
        )),
        (git2::ErrorClass::Net, _) | (git2::ErrorClass::Http, _) => Error::Other(format!(
            "Network error cloning {}: {}",
            url,
            err.message()
        )),
        (_, git2::ErrorCode::NotFound) => Error::Other(format!(
            "Repository not found: {}. Check the URL is correct.",
            url
        )),
        _ => Error::Other(format!("git clone failed: {}", err.message())),
    }
}

/// Remove a repository directory
///
/// Returns `false` if there was nothing to remove.
pub async fn remove_repo(path: &Path) -> Result<bool> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::GitRepo;
    use crate::testing::{file_source, init_origin};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_clone_local_origin() {
        let temp = TempDir::new().unwrap();
        let origin = init_origin(temp.path(), "widgets.git");
        let target = temp.path().join("repos").join("widgets");

        let source = file_source(&origin);
        let path = clone_repo(&source, &target).await.unwrap();
        assert_eq!(path, target);

        let cloned = GitRepo::open(&target).unwrap();
        assert_eq!(cloned.origin_url().as_deref(), Some(source.as_str()));
        let head = cloned.latest_commit().unwrap().unwrap();
        assert_eq!(head.summary, "Initial import");
    }

    #[tokio::test]
    async fn test_clone_missing_origin_fails() {
        let temp = TempDir::new().unwrap();
        let source = file_source(&temp.path().join("does-not-exist.git"));
        let target = temp.path().join("repos").join("does-not-exist");

        assert!(clone_repo(&source, &target).await.is_err());
    }

    #[tokio::test]
    async fn test_remove_repo_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("foo");
        std::fs::create_dir_all(path.join("objects")).unwrap();

        assert!(remove_repo(&path).await.unwrap());
        assert!(!path.exists());
        assert!(!remove_repo(&path).await.unwrap());
    }
}
