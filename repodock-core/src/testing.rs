//! Shared helpers for unit tests

use std::path::{Path, PathBuf};

use git2::Repository;

use crate::name::RepositorySource;

/// Commit a README with `message` as content and commit message
pub(crate) fn commit_file(repo: &Repository, message: &str) {
    let sig = git2::Signature::now("Test Author", "author@example.com").unwrap();
    let workdir = repo.workdir().unwrap();
    std::fs::write(workdir.join("README"), message).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new("README")).unwrap();
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();

    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<_> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .unwrap();
}

/// Create a repository with one commit at `dir/name` to clone from
pub(crate) fn init_origin(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::create_dir_all(&path).unwrap();
    let repo = Repository::init(&path).unwrap();
    commit_file(&repo, "Initial import");
    path
}

/// `file://` source for a local origin
pub(crate) fn file_source(path: &Path) -> RepositorySource {
    let url = url::Url::from_file_path(path).unwrap();
    RepositorySource::parse(url.as_str()).unwrap()
}
