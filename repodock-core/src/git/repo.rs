//! On-disk repository handles

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use git2::Repository;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Summary of a commit, as shown next to each catalogued repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    pub summary: String,
    pub author: String,
    pub committed_at: DateTime<Utc>,
}

/// A git repository opened at an exact path
pub struct GitRepo {
    /// The underlying git2 repository
    repo: Repository,
    /// Path the repository was opened at
    root: PathBuf,
}

impl std::fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepo")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl GitRepo {
    /// Open the repository at `path`
    ///
    /// Unlike discovery, this does not search parent directories: a plain
    /// directory inside the repository root is not a repository.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let repo = Repository::open(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                Error::Other(format!("Not a git repository: {}", path.display()))
            } else {
                Error::Git(e)
            }
        })?;

        Ok(Self {
            repo,
            root: path.to_path_buf(),
        })
    }

    /// Check if the given path is itself a git repository
    pub fn is_git_repo(path: impl AsRef<Path>) -> bool {
        Repository::open(path.as_ref()).is_ok()
    }

    /// Get the repository root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// URL of the `origin` remote, if configured
    pub fn origin_url(&self) -> Option<String> {
        self.repo
            .find_remote("origin")
            .ok()
            .and_then(|remote| remote.url().map(|s| s.to_string()))
    }

    /// The commit HEAD points at
    ///
    /// Returns `None` for a freshly initialised repository with no commits.
    pub fn latest_commit(&self) -> Result<Option<CommitSummary>> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                return Ok(None)
            }
            Err(e) => return Err(Error::Git(e)),
        };

        let commit = head.peel_to_commit()?;
        let committed_at = Utc
            .timestamp_opt(commit.time().seconds(), 0)
            .single()
            .unwrap_or_default();
        let author = commit.author().name().unwrap_or_default().to_string();

        Ok(Some(CommitSummary {
            sha: commit.id().to_string(),
            summary: commit.summary().unwrap_or_default().to_string(),
            author,
            committed_at,
        }))
    }

    /// Get access to the underlying git2 repository
    pub fn inner(&self) -> &Repository {
        &self.repo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::commit_file;
    use tempfile::TempDir;

    #[test]
    fn test_open_non_git_dir() {
        let temp = TempDir::new().unwrap();
        assert!(GitRepo::open(temp.path()).is_err());
        assert!(!GitRepo::is_git_repo(temp.path()));
    }

    #[test]
    fn test_latest_commit() {
        let temp = TempDir::new().unwrap();
        let repo = Repository::init(temp.path()).unwrap();

        let git_repo = GitRepo::open(temp.path()).unwrap();
        assert!(git_repo.latest_commit().unwrap().is_none());

        commit_file(&repo, "Initial import");
        commit_file(&repo, "Fix the widget");

        let latest = git_repo.latest_commit().unwrap().unwrap();
        assert_eq!(latest.summary, "Fix the widget");
        assert_eq!(latest.author, "Test Author");
        assert_eq!(latest.sha.len(), 40);
    }

    #[test]
    fn test_origin_url() {
        let temp = TempDir::new().unwrap();
        let repo = Repository::init(temp.path()).unwrap();
        repo.remote("origin", "https://example.com/foo.git").unwrap();

        let git_repo = GitRepo::open(temp.path()).unwrap();
        assert_eq!(
            git_repo.origin_url().as_deref(),
            Some("https://example.com/foo.git")
        );
    }
}
