//! Repository catalog
//!
//! The catalog is the authoritative list of provisioned repositories. Entries
//! are written by the clone worker (and the repository-root scan) and removed
//! by the delete worker. [`RepoHandles`] caches opened on-disk repositories
//! for readers.

pub mod handles;
pub mod memory;
pub mod scan;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::name::RepositoryName;
use crate::Result;

pub use handles::RepoHandles;
pub use memory::MemoryCatalog;
pub use scan::scan_for_new_repos;

/// How an entry came to be in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestionState {
    /// Established by the clone worker
    Cloned,
    /// Found on disk by a repository-root scan
    Discovered,
}

impl IngestionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestionState::Cloned => "cloned",
            IngestionState::Discovered => "discovered",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cloned" => Some(IngestionState::Cloned),
            "discovered" => Some(IngestionState::Discovered),
            _ => None,
        }
    }
}

/// A catalogued repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: RepositoryName,
    pub path: PathBuf,
    pub state: IngestionState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogEntry {
    pub fn new(name: RepositoryName, path: impl Into<PathBuf>, state: IngestionState) -> Self {
        let now = Utc::now();
        Self {
            name,
            path: path.into(),
            state,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the entry's path still exists on disk
    ///
    /// Entries failing this check are stale and must not be listed as usable.
    pub fn is_present(&self) -> bool {
        self.path.is_dir()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Persistent record of known repositories
#[async_trait]
pub trait Catalog: Send + Sync {
    /// All entries ordered by name, stale ones included
    async fn list(&self) -> Result<Vec<CatalogEntry>>;

    /// Look up a single entry
    async fn get(&self, name: &RepositoryName) -> Result<Option<CatalogEntry>>;

    /// Create an entry or update path and state of an existing one
    async fn upsert(&self, entry: &CatalogEntry) -> Result<()>;

    /// Remove an entry; returns whether one existed
    async fn remove(&self, name: &RepositoryName) -> Result<bool>;
}
