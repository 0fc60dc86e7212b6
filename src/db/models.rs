use crate::logical::StorageEntry;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct DbEntry {
    pub key: String,
    pub value: Vec<u8>,
    pub updated_at: DateTime<Utc>,
}

impl From<StorageEntry> for DbEntry {
    fn from(e: StorageEntry) -> Self {
        Self {
            key: e.key,
            value: e.value,
            updated_at: Utc::now(),
        }
    }
}

impl From<DbEntry> for StorageEntry {
    fn from(d: DbEntry) -> Self {
        StorageEntry {
            key: d.key,
            value: d.value,
        }
    }
}
