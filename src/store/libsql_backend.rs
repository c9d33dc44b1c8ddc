//! libSQL session store backend.
//!
//! Durable alternative to `MemoryStore` for embedders that want flow
//! progress to survive process restarts. Supports local file and in-memory
//! databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{params, Connection, Database};
use tracing::info;

use crate::error::StoreError;

use super::SessionStore;

/// libSQL-backed session store.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<Database>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Open(format!("Failed to create store directory: {e}")))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        info!(path = %path.display(), "Session store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS session_store (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )",
                params![],
            )
            .await
            .map_err(|e| StoreError::Open(format!("Failed to create schema: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for LibSqlStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT value FROM session_store WHERE key = ?1",
                params![key],
            )
            .await
            .map_err(|e| StoreError::Query(format!("get: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<String>(0).ok()),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Query(format!("get: {e}"))),
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO session_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (key) DO UPDATE SET value = ?2, updated_at = ?3",
                params![key, value, now],
            )
            .await
            .map_err(|e| StoreError::Query(format!("put: {e}")))?;
        Ok(())
    }

    async fn put_many(&self, entries: &[(&str, String)]) -> Result<(), StoreError> {
        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| StoreError::Query(format!("put_many begin: {e}")))?;

        let now = Utc::now().to_rfc3339();
        for (key, value) in entries {
            tx.execute(
                "INSERT INTO session_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT (key) DO UPDATE SET value = ?2, updated_at = ?3",
                params![*key, value.as_str(), now.as_str()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("put_many: {e}")))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Query(format!("put_many commit: {e}")))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM session_store WHERE key = ?1", params![key])
            .await
            .map_err(|e| StoreError::Query(format!("remove: {e}")))?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM session_store", params![])
            .await
            .map_err(|e| StoreError::Query(format!("clear: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::keys;

    #[tokio::test]
    async fn roundtrip_in_memory() {
        let store = LibSqlStore::new_memory().await.unwrap();
        assert!(store.get(keys::STAGE).await.unwrap().is_none());

        store.put(keys::STAGE, "problem-questions").await.unwrap();
        assert_eq!(
            store.get(keys::STAGE).await.unwrap().as_deref(),
            Some("problem-questions")
        );

        store.put(keys::STAGE, "signup").await.unwrap();
        assert_eq!(store.get(keys::STAGE).await.unwrap().as_deref(), Some("signup"));

        store.remove(keys::STAGE).await.unwrap();
        assert!(store.get(keys::STAGE).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_many_writes_the_whole_batch() {
        let store = LibSqlStore::new_memory().await.unwrap();
        store
            .put_many(&[
                (keys::STAGE, "summary".to_string()),
                (keys::PROBLEM_ANSWERS, r#"{"impact":"churn"}"#.to_string()),
                (keys::AUTHENTICATED, "true".to_string()),
            ])
            .await
            .unwrap();

        assert_eq!(store.get(keys::STAGE).await.unwrap().as_deref(), Some("summary"));
        assert_eq!(
            store.get(keys::PROBLEM_ANSWERS).await.unwrap().as_deref(),
            Some(r#"{"impact":"churn"}"#)
        );
        assert_eq!(
            store.get(keys::AUTHENTICATED).await.unwrap().as_deref(),
            Some("true")
        );
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.db");

        {
            let store = LibSqlStore::new_local(&path).await.unwrap();
            store.put(keys::INITIAL_PROBLEM, "crm mess").await.unwrap();
        }

        let store = LibSqlStore::new_local(&path).await.unwrap();
        assert_eq!(
            store.get(keys::INITIAL_PROBLEM).await.unwrap().as_deref(),
            Some("crm mess")
        );
    }

    #[tokio::test]
    async fn clear_empties_store() {
        let store = LibSqlStore::new_memory().await.unwrap();
        store.put("a", "1").await.unwrap();
        store.clear().await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
    }
}
