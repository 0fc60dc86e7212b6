use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::error::PluginError;
use crate::framework::{
    ExistenceCheck, FieldData, FieldSchema, FieldType, OperationHandler, Path, PathOperation,
};
use crate::logical::{Operation, Request, Response, Storage, StorageEntry};

/// Storage key of the singleton configuration record.
pub const CONFIG_KEY: &str = "config";

const CONFIG_HELP: &str = "\
Configures the UpCloud admin credentials used to manage subaccounts.";

/// Admin credentials for the UpCloud API.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcloudAuth {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for UpcloudAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpcloudAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

pub fn config_paths() -> Result<Vec<Path>, regex::Error> {
    Ok(vec![
        Path::new(CONFIG_KEY)?
            .field(
                "username",
                FieldSchema::new(FieldType::String)
                    .required()
                    .description("Specifies the upcloud Admin username to authenticate."),
            )
            .field(
                "password",
                FieldSchema::new(FieldType::String)
                    .required()
                    .description("Specifies the upcloud Admin username's password to authenticate."),
            )
            .operation(
                Operation::Read,
                PathOperation::new(Arc::new(ConfigRead), "Retrieve the UpCloud configuration."),
            )
            .operation(
                Operation::Create,
                PathOperation::new(Arc::new(ConfigWrite), "Store the UpCloud configuration."),
            )
            .operation(
                Operation::Update,
                PathOperation::new(Arc::new(ConfigWrite), "Update the UpCloud configuration."),
            )
            .operation(
                Operation::Delete,
                PathOperation::new(Arc::new(ConfigDelete), "Delete the UpCloud configuration."),
            )
            .existence_check(Arc::new(ConfigExists))
            .help(CONFIG_HELP),
    ])
}

/// Load the stored configuration, `None` when the engine is unconfigured.
pub async fn read_config(storage: &dyn Storage) -> Result<Option<UpcloudAuth>, PluginError> {
    let entry = storage
        .get(CONFIG_KEY)
        .await
        .map_err(|e| PluginError::storage("fetch StorageEntry", CONFIG_KEY, e))?;
    entry.map(|e| e.decode_json()).transpose()
}

struct ConfigExists;

#[async_trait]
impl ExistenceCheck for ConfigExists {
    async fn exists(&self, req: &Request, _data: &FieldData) -> Result<bool, PluginError> {
        let entry = req
            .storage()
            .get(CONFIG_KEY)
            .await
            .map_err(|e| PluginError::storage("run existence check on", CONFIG_KEY, e))?;
        Ok(entry.is_some())
    }
}

struct ConfigRead;

#[async_trait]
impl OperationHandler for ConfigRead {
    async fn handle(
        &self,
        req: &Request,
        _data: &FieldData,
    ) -> Result<Option<Response>, PluginError> {
        let Some(auth) = read_config(req.storage()).await? else {
            return Ok(Some(Response::error("backend not configured")));
        };

        let mut data = Map::new();
        data.insert("username".to_string(), Value::String(auth.username));
        data.insert("password".to_string(), Value::String(auth.password));
        Ok(Some(Response::with_data(data)))
    }
}

struct ConfigWrite;

#[async_trait]
impl OperationHandler for ConfigWrite {
    async fn handle(
        &self,
        req: &Request,
        data: &FieldData,
    ) -> Result<Option<Response>, PluginError> {
        let mut auth = read_config(req.storage()).await?.unwrap_or_default();

        if let Some(username) = data.get_string_ok("username")? {
            auth.username = username;
        }
        if let Some(password) = data.get_string_ok("password")? {
            auth.password = password;
        }

        if auth.username.is_empty() {
            return Ok(Some(Response::error("must provide a username")));
        }
        if auth.password.is_empty() {
            return Ok(Some(Response::error("must provide a password")));
        }

        let entry = StorageEntry::json(CONFIG_KEY, &auth)?;
        req.storage()
            .put(entry)
            .await
            .map_err(|e| PluginError::storage("put config to", CONFIG_KEY, e))?;

        info!(username = %auth.username, "stored upcloud configuration");
        Ok(None)
    }
}

struct ConfigDelete;

#[async_trait]
impl OperationHandler for ConfigDelete {
    async fn handle(
        &self,
        req: &Request,
        _data: &FieldData,
    ) -> Result<Option<Response>, PluginError> {
        req.storage()
            .delete(CONFIG_KEY)
            .await
            .map_err(|e| PluginError::storage("delete", CONFIG_KEY, e))?;
        info!("deleted upcloud configuration");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logical::{BackendConfig, InMemoryStorage};
    use crate::upcloud::{UpcloudBackend, factory};
    use serde_json::json;
    use std::time::Duration;

    fn engine() -> UpcloudBackend {
        factory(BackendConfig {
            storage: Arc::new(InMemoryStorage::new()),
            mount_point: "upcloud/".into(),
            default_lease_ttl: Duration::from_secs(60),
        })
        .unwrap()
    }

    fn body(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("body must be an object"),
        }
    }

    async fn write(b: &UpcloudBackend, data: Value) -> Option<Response> {
        let req = b
            .request(Operation::Create, "config")
            .with_client_token("root")
            .with_data(body(data));
        b.handle_request(&req).await.unwrap()
    }

    async fn read(b: &UpcloudBackend) -> Response {
        let req = b.request(Operation::Read, "config").with_client_token("root");
        b.handle_request(&req).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn write_then_read_returns_fields() {
        let b = engine();
        assert!(write(&b, json!({"username": "admin", "password": "s3cret"})).await.is_none());

        let resp = read(&b).await;
        assert_eq!(resp.data["username"], json!("admin"));
        assert_eq!(resp.data["password"], json!("s3cret"));
    }

    #[tokio::test]
    async fn read_unconfigured_is_soft_error() {
        let resp = read(&engine()).await;
        assert_eq!(resp.error_message(), Some("backend not configured"));
    }

    #[tokio::test]
    async fn delete_then_read_reports_unconfigured() {
        let b = engine();
        write(&b, json!({"username": "admin", "password": "s3cret"})).await;

        let req = b.request(Operation::Delete, "config").with_client_token("root");
        assert!(b.handle_request(&req).await.unwrap().is_none());
        // second delete of an absent record is fine
        assert!(b.handle_request(&req).await.unwrap().is_none());

        assert_eq!(read(&b).await.error_message(), Some("backend not configured"));
    }

    #[tokio::test]
    async fn update_keeps_unsent_fields() {
        let b = engine();
        write(&b, json!({"username": "admin", "password": "old"})).await;
        assert!(write(&b, json!({"password": "new"})).await.is_none());

        let auth = read_config(b.storage().as_ref()).await.unwrap().unwrap();
        assert_eq!(auth.username, "admin");
        assert_eq!(auth.password, "new");
    }

    #[tokio::test]
    async fn missing_required_fields_are_soft_errors() {
        let b = engine();
        let resp = write(&b, json!({"password": "x"})).await.unwrap();
        assert_eq!(resp.error_message(), Some("must provide a username"));

        let resp = write(&b, json!({"username": "admin"})).await.unwrap();
        assert_eq!(resp.error_message(), Some("must provide a password"));

        assert!(read_config(b.storage().as_ref()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_record_is_hard_error() {
        let b = engine();
        b.storage()
            .put(StorageEntry::new(CONFIG_KEY, b"{not json".to_vec()))
            .await
            .unwrap();

        let req = b.request(Operation::Read, "config").with_client_token("root");
        let err = b.handle_request(&req).await.unwrap_err();
        assert!(matches!(err, PluginError::Decode { .. }));
    }

    #[test]
    fn debug_redacts_password() {
        let auth = UpcloudAuth {
            username: "admin".into(),
            password: "s3cret".into(),
        };
        assert!(!format!("{auth:?}").contains("s3cret"));
    }
}
