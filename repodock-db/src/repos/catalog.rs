//! SQLite repository catalog

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use repodock_core::catalog::{Catalog, CatalogEntry, IngestionState};
use repodock_core::name::RepositoryName;

use crate::{Error, Result};

#[derive(Debug, sqlx::FromRow)]
struct RepositoryRow {
    name: String,
    path: String,
    state: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RepositoryRow> for CatalogEntry {
    type Error = Error;

    fn try_from(row: RepositoryRow) -> Result<Self> {
        let name = RepositoryName::new(row.name)
            .map_err(|e| Error::InvalidData(format!("repository name: {}", e)))?;
        let state = IngestionState::parse(&row.state).ok_or_else(|| {
            Error::InvalidData(format!("unknown ingestion state '{}' for {}", row.state, name))
        })?;

        Ok(CatalogEntry {
            name,
            path: PathBuf::from(row.path),
            state,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// [`Catalog`] stored in the `repositories` table
#[derive(Debug, Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn list(&self) -> repodock_core::Result<Vec<CatalogEntry>> {
        let rows = sqlx::query_as::<_, RepositoryRow>(
            "SELECT name, path, state, created_at, updated_at FROM repositories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::from)?;

        let entries = rows
            .into_iter()
            .map(CatalogEntry::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(entries)
    }

    async fn get(&self, name: &RepositoryName) -> repodock_core::Result<Option<CatalogEntry>> {
        let row = sqlx::query_as::<_, RepositoryRow>(
            "SELECT name, path, state, created_at, updated_at FROM repositories WHERE name = ?",
        )
        .bind(name.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::from)?;

        Ok(row.map(CatalogEntry::try_from).transpose()?)
    }

    async fn upsert(&self, entry: &CatalogEntry) -> repodock_core::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO repositories (name, path, state, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                path = excluded.path,
                state = excluded.state,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(entry.name.as_str())
        .bind(entry.path.to_string_lossy().into_owned())
        .bind(entry.state.as_str())
        .bind(entry.created_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::from)?;

        Ok(())
    }

    async fn remove(&self, name: &RepositoryName) -> repodock_core::Result<bool> {
        let result = sqlx::query("DELETE FROM repositories WHERE name = ?")
            .bind(name.as_str())
            .execute(&self.pool)
            .await
            .map_err(Error::from)?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use tempfile::TempDir;

    async fn setup() -> (TempDir, SqliteCatalog) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::new(temp_dir.path().join("test.db")).await.unwrap();
        (temp_dir, db.catalog())
    }

    fn entry(name: &str, state: IngestionState) -> CatalogEntry {
        CatalogEntry::new(
            RepositoryName::new(name).unwrap(),
            format!("/srv/repos/{}", name),
            state,
        )
    }

    #[tokio::test]
    async fn test_upsert_and_list_ordered() {
        let (_temp, catalog) = setup().await;
        catalog.upsert(&entry("zeta", IngestionState::Cloned)).await.unwrap();
        catalog
            .upsert(&entry("alpha", IngestionState::Discovered))
            .await
            .unwrap();

        let entries = catalog.list().await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert_eq!(entries[0].state, IngestionState::Discovered);
        assert_eq!(entries[1].path, PathBuf::from("/srv/repos/zeta"));
    }

    #[tokio::test]
    async fn test_upsert_updates_existing() {
        let (_temp, catalog) = setup().await;
        let original = entry("foo", IngestionState::Discovered);
        catalog.upsert(&original).await.unwrap();

        let mut changed = entry("foo", IngestionState::Cloned);
        changed.path = PathBuf::from("/data/foo");
        catalog.upsert(&changed).await.unwrap();

        let stored = catalog.get(&original.name).await.unwrap().unwrap();
        assert_eq!(stored.state, IngestionState::Cloned);
        assert_eq!(stored.path, PathBuf::from("/data/foo"));
        assert_eq!(catalog.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (_temp, catalog) = setup().await;
        let foo = entry("foo", IngestionState::Cloned);
        catalog.upsert(&foo).await.unwrap();

        assert!(catalog.remove(&foo.name).await.unwrap());
        assert!(!catalog.remove(&foo.name).await.unwrap());
        assert!(catalog.get(&foo.name).await.unwrap().is_none());
    }
}
