use crate::db::models::DbEntry;
use crate::db::schema::SQLITE_INIT;
use crate::error::PluginError;
use crate::logical::storage::immediate_children;
use crate::logical::{Storage, StorageEntry};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use tracing::debug;

pub type SqlitePool = Pool<Sqlite>;

#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database at `database_url` and
    /// initialize the schema.
    pub async fn connect(database_url: &str) -> Result<Self, PluginError> {
        let connect_opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
        let storage = Self::new(pool);
        storage.init_schema().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), PluginError> {
        // execute multiple statements safely (SQLite supports multi-commands but sqlx::query doesn't)
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn get_entry(&self, key: &str) -> Result<Option<DbEntry>, PluginError> {
        let row = sqlx::query("SELECT key, value, updated_at FROM entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Self::row_to_model).transpose()
    }

    /// Upsert by key.
    /// Uses SQLite `INSERT ... ON CONFLICT(key) DO UPDATE`.
    pub async fn upsert(&self, entry: DbEntry) -> Result<(), PluginError> {
        sqlx::query(
            r#"
            INSERT INTO entries (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value=excluded.value,
                updated_at=excluded.updated_at
            "#,
        )
        .bind(entry.key)
        .bind(entry.value)
        .bind(entry.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, PluginError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT key FROM entries WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(key,)| key).collect())
    }

    fn row_to_model(row: SqliteRow) -> Result<DbEntry, PluginError> {
        let key: String = row.try_get("key")?;
        let value: Vec<u8> = row.try_get("value")?;
        let updated_at_str: String = row.try_get("updated_at")?;

        let updated_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&updated_at_str)
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?
            .with_timezone(&Utc);

        Ok(DbEntry {
            key,
            value,
            updated_at,
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn get(&self, key: &str) -> Result<Option<StorageEntry>, PluginError> {
        Ok(self.get_entry(key).await?.map(StorageEntry::from))
    }

    async fn put(&self, entry: StorageEntry) -> Result<(), PluginError> {
        debug!(key = %entry.key, "storing entry");
        self.upsert(entry.into()).await
    }

    async fn delete(&self, key: &str) -> Result<(), PluginError> {
        sqlx::query("DELETE FROM entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, PluginError> {
        let keys = self.keys_with_prefix(prefix).await?;
        Ok(immediate_children(prefix, keys.iter().map(String::as_str)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_storage() -> SqliteStorage {
        // a single connection keeps the in-memory database alive and shared
        let opts = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await
            .unwrap();
        let storage = SqliteStorage::new(pool);
        storage.init_schema().await.unwrap();
        storage
    }

    #[tokio::test]
    async fn upsert_overwrites_value() {
        let storage = memory_storage().await;
        storage
            .put(StorageEntry::new("config", b"one".to_vec()))
            .await
            .unwrap();
        storage
            .put(StorageEntry::new("config", b"two".to_vec()))
            .await
            .unwrap();

        let entry = storage.get("config").await.unwrap().unwrap();
        assert_eq!(entry.value, b"two");
        assert!(storage.get_entry("config").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_missing_key_is_ok() {
        let storage = memory_storage().await;
        storage.delete("config").await.unwrap();
        assert!(storage.get("config").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_only_matches_prefix() {
        let storage = memory_storage().await;
        for key in ["subaccount/alice", "subaccount/bob", "subaccountx", "config"] {
            storage
                .put(StorageEntry::new(key, b"{}".to_vec()))
                .await
                .unwrap();
        }
        let keys = storage.list("subaccount/").await.unwrap();
        assert_eq!(keys, vec!["alice".to_string(), "bob".to_string()]);
    }
}
