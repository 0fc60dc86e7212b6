//! Storage abstraction the host hands to every request.
//!
//! Engines never own their persistence: each `Request` carries an
//! `Arc<dyn Storage>` and handlers read and write `StorageEntry` values
//! through it. Keys are `/`-separated paths relative to the mount.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;

use crate::error::PluginError;

/// A single key/value pair as persisted by a `Storage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntry {
    pub key: String,
    pub value: Vec<u8>,
}

impl StorageEntry {
    pub fn new(key: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Build an entry whose value is the JSON encoding of `value`.
    pub fn json<T: Serialize>(key: impl Into<String>, value: &T) -> Result<Self, PluginError> {
        let key = key.into();
        let value = serde_json::to_vec(value).map_err(|source| PluginError::Encode {
            key: key.clone(),
            source,
        })?;
        Ok(Self { key, value })
    }

    pub fn decode_json<T: DeserializeOwned>(&self) -> Result<T, PluginError> {
        serde_json::from_slice(&self.value).map_err(|source| PluginError::Decode {
            key: self.key.clone(),
            source,
        })
    }
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch the entry at `key`, or `None` when nothing is stored there.
    async fn get(&self, key: &str) -> Result<Option<StorageEntry>, PluginError>;

    /// Insert or overwrite an entry.
    async fn put(&self, entry: StorageEntry) -> Result<(), PluginError>;

    /// Remove the entry at `key`. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), PluginError>;

    /// List the immediate children of `prefix`.
    ///
    /// Results are relative to the prefix; children that have further
    /// descendants are returned once, with a trailing `/`.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, PluginError>;
}

/// Collapse full keys under `prefix` into their first path segment.
pub(crate) fn immediate_children<'a>(
    prefix: &str,
    keys: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    let children: BTreeSet<String> = keys
        .into_iter()
        .filter_map(|key| key.strip_prefix(prefix))
        .filter(|rest| !rest.is_empty())
        .map(|rest| match rest.find('/') {
            Some(idx) => rest[..=idx].to_string(),
            None => rest.to_string(),
        })
        .collect();
    children.into_iter().collect()
}

/// Process-local storage, used by tests and `storage = "memory"` runs.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    data: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<StorageEntry>, PluginError> {
        let data = self.data.read().await;
        Ok(data
            .get(key)
            .map(|value| StorageEntry::new(key, value.clone())))
    }

    async fn put(&self, entry: StorageEntry) -> Result<(), PluginError> {
        let mut data = self.data.write().await;
        data.insert(entry.key, entry.value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), PluginError> {
        let mut data = self.data.write().await;
        data.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, PluginError> {
        let data = self.data.read().await;
        Ok(immediate_children(prefix, data.keys().map(String::as_str)))
    }
}
