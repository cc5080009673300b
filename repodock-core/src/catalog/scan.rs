//! Repository-root scanning

use std::path::Path;

use super::{Catalog, CatalogEntry, IngestionState};
use crate::git::GitRepo;
use crate::name::RepositoryName;
use crate::Result;

/// Register git repositories under `root` that the catalog does not know
///
/// Dot directories (including the clone staging area) and entries whose
/// names are not valid repository names are skipped. Returns the names that
/// were added.
pub async fn scan_for_new_repos(root: &Path, catalog: &dyn Catalog) -> Result<Vec<RepositoryName>> {
    let mut added = Vec::new();

    let dir = match std::fs::read_dir(root) {
        Ok(dir) => dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(added),
        Err(e) => return Err(e.into()),
    };

    let mut candidates = Vec::new();
    for entry in dir {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }

        let Some(name) = entry
            .file_name()
            .to_str()
            .and_then(|s| RepositoryName::new(s).ok())
        else {
            continue;
        };

        if GitRepo::is_git_repo(&path) {
            candidates.push((name, path));
        }
    }
    candidates.sort();

    for (name, path) in candidates {
        if catalog.get(&name).await?.is_some() {
            continue;
        }

        tracing::info!(name = %name, path = %path.display(), "Discovered untracked repository");
        catalog
            .upsert(&CatalogEntry::new(name.clone(), path, IngestionState::Discovered))
            .await?;
        added.push(name);
    }

    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::testing::init_origin;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_scan_registers_untracked_repos() {
        let temp = TempDir::new().unwrap();
        init_origin(temp.path(), "alpha");
        init_origin(temp.path(), "beta");
        init_origin(&temp.path().join(".cloning"), "gamma.1");
        std::fs::create_dir_all(temp.path().join("not-a-repo")).unwrap();

        let catalog = MemoryCatalog::new();
        let existing = CatalogEntry::new(
            RepositoryName::new("beta").unwrap(),
            temp.path().join("beta"),
            IngestionState::Cloned,
        );
        catalog.upsert(&existing).await.unwrap();

        let added = scan_for_new_repos(temp.path(), &catalog).await.unwrap();
        assert_eq!(added, vec![RepositoryName::new("alpha").unwrap()]);

        let beta = catalog.get(&RepositoryName::new("beta").unwrap()).await.unwrap().unwrap();
        assert_eq!(beta.state, IngestionState::Cloned);
        assert_eq!(catalog.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_scan_missing_root() {
        let temp = TempDir::new().unwrap();
        let catalog = MemoryCatalog::new();
        let added = scan_for_new_repos(&temp.path().join("nope"), &catalog).await.unwrap();
        assert!(added.is_empty());
    }
}
