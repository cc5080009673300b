//! Read-through cache of opened repositories

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use super::CatalogEntry;
use crate::git::GitRepo;
use crate::name::RepositoryName;

/// Cache of [`GitRepo`] handles keyed by repository name
///
/// A handle is only handed out while the entry's path still exists; entries
/// that were moved or deleted behind the catalog's back resolve to `None`
/// and are dropped from the cache.
#[derive(Debug, Default)]
pub struct RepoHandles {
    cache: Mutex<HashMap<RepositoryName, GitRepo>>,
}

impl RepoHandles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against the opened repository for `entry`
    ///
    /// Returns `None` if the repository cannot be resolved on disk.
    pub fn with_handle<T>(
        &self,
        entry: &CatalogEntry,
        f: impl FnOnce(&GitRepo) -> T,
    ) -> Option<T> {
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);

        if !entry.is_present() {
            cache.remove(&entry.name);
            return None;
        }

        let stale = cache
            .get(&entry.name)
            .is_some_and(|repo| repo.root() != entry.path);
        if stale {
            cache.remove(&entry.name);
        }

        if !cache.contains_key(&entry.name) {
            match GitRepo::open(&entry.path) {
                Ok(repo) => {
                    cache.insert(entry.name.clone(), repo);
                }
                Err(e) => {
                    tracing::debug!(
                        name = %entry.name,
                        error = %e,
                        "Repository handle unavailable"
                    );
                    return None;
                }
            }
        }

        cache.get(&entry.name).map(f)
    }

    /// Drop a cached handle
    pub fn evict(&self, name: &RepositoryName) {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }

    /// Paths of the currently cached handles
    pub fn cached_paths(&self) -> Vec<PathBuf> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|repo| repo.root().to_path_buf())
            .collect()
    }
}
