//! In-memory catalog for tests

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use super::{Catalog, CatalogEntry};
use crate::name::RepositoryName;
use crate::{Error, Result};

/// In-memory implementation of [`Catalog`]
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    entries: Mutex<BTreeMap<RepositoryName, CatalogEntry>>,
}

fn poison_err<T>(_: PoisonError<T>) -> Error {
    Error::Storage("catalog lock poisoned".to_string())
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn list(&self) -> Result<Vec<CatalogEntry>> {
        let entries = self.entries.lock().map_err(poison_err)?;
        Ok(entries.values().cloned().collect())
    }

    async fn get(&self, name: &RepositoryName) -> Result<Option<CatalogEntry>> {
        let entries = self.entries.lock().map_err(poison_err)?;
        Ok(entries.get(name).cloned())
    }

    async fn upsert(&self, entry: &CatalogEntry) -> Result<()> {
        let mut entries = self.entries.lock().map_err(poison_err)?;

        match entries.get_mut(&entry.name) {
            Some(existing) => {
                existing.path = entry.path.clone();
                existing.state = entry.state;
                existing.updated_at = Utc::now();
            }
            None => {
                entries.insert(entry.name.clone(), entry.clone());
            }
        }

        Ok(())
    }

    async fn remove(&self, name: &RepositoryName) -> Result<bool> {
        let mut entries = self.entries.lock().map_err(poison_err)?;
        Ok(entries.remove(name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::IngestionState;

    fn name(s: &str) -> RepositoryName {
        RepositoryName::new(s).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_and_remove() {
        let catalog = MemoryCatalog::new();
        let entry = CatalogEntry::new(name("foo"), "/srv/repos/foo", IngestionState::Discovered);
        catalog.upsert(&entry).await.unwrap();

        let updated = CatalogEntry::new(name("foo"), "/srv/repos/foo", IngestionState::Cloned);
        catalog.upsert(&updated).await.unwrap();

        let found = catalog.get(&name("foo")).await.unwrap().unwrap();
        assert_eq!(found.state, IngestionState::Cloned);
        assert_eq!(found.created_at, entry.created_at);

        assert!(catalog.remove(&name("foo")).await.unwrap());
        assert!(!catalog.remove(&name("foo")).await.unwrap());
        assert!(catalog.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let catalog = MemoryCatalog::new();
        for n in ["zeta", "alpha", "mid"] {
            let entry = CatalogEntry::new(name(n), format!("/srv/{}", n), IngestionState::Cloned);
            catalog.upsert(&entry).await.unwrap();
        }

        let names: Vec<_> = catalog
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name.to_string())
            .collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }
}
