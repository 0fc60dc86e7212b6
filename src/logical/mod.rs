//! Request, response and lease types exchanged between the host and an engine.

pub mod storage;

pub use storage::{InMemoryStorage, Storage, StorageEntry};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Internal-data key that records which secret type issued a lease.
pub const SECRET_TYPE_KEY: &str = "secret_type";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
    List,
    Revoke,
    Renew,
    Help,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::List => "list",
            Self::Revoke => "revoke",
            Self::Renew => "renew",
            Self::Help => "help",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lease handed out alongside a secret.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretLease {
    pub secret_type: String,
    #[serde(default)]
    pub internal_data: Map<String, Value>,
    #[serde(default)]
    pub ttl_secs: u64,
    #[serde(default)]
    pub renewable: bool,
    #[serde(default = "Utc::now")]
    pub issue_time: DateTime<Utc>,
}

impl SecretLease {
    pub fn new(secret_type: impl Into<String>, internal_data: Map<String, Value>) -> Self {
        let secret_type = secret_type.into();
        let mut internal_data = internal_data;
        internal_data.insert(
            SECRET_TYPE_KEY.to_string(),
            Value::String(secret_type.clone()),
        );
        Self {
            secret_type,
            internal_data,
            ttl_secs: 0,
            renewable: false,
            issue_time: Utc::now(),
        }
    }

    /// Secret type recorded in the internal data, falling back to the lease field.
    pub fn recorded_type(&self) -> &str {
        self.internal_data
            .get(SECRET_TYPE_KEY)
            .and_then(Value::as_str)
            .unwrap_or(&self.secret_type)
    }
}

/// What the host passes to an engine factory.
#[derive(Clone)]
pub struct BackendConfig {
    pub storage: Arc<dyn Storage>,
    pub mount_point: String,
    pub default_lease_ttl: Duration,
}

impl fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendConfig")
            .field("mount_point", &self.mount_point)
            .field("default_lease_ttl", &self.default_lease_ttl)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct Request {
    pub operation: Operation,
    pub path: String,
    pub data: Map<String, Value>,
    pub client_token: String,
    pub mount_point: String,
    pub secret: Option<SecretLease>,
    storage: Arc<dyn Storage>,
}

impl Request {
    pub fn new(operation: Operation, path: impl Into<String>, storage: Arc<dyn Storage>) -> Self {
        Self {
            operation,
            path: path.into(),
            data: Map::new(),
            client_token: String::new(),
            mount_point: String::new(),
            secret: None,
            storage,
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    pub fn with_client_token(mut self, token: impl Into<String>) -> Self {
        self.client_token = token.into();
        self
    }

    pub fn with_mount_point(mut self, mount_point: impl Into<String>) -> Self {
        self.mount_point = mount_point.into();
        self
    }

    pub fn with_secret(mut self, secret: SecretLease) -> Self {
        self.secret = Some(secret);
        self
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // request data may hold credentials
        f.debug_struct("Request")
            .field("operation", &self.operation)
            .field("path", &self.path)
            .field("mount_point", &self.mount_point)
            .field("fields", &self.data.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Response {
    pub data: Map<String, Value>,
    #[serde(rename = "lease")]
    pub secret: Option<SecretLease>,
    pub warnings: Vec<String>,
}

impl Response {
    pub fn with_data(data: Map<String, Value>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    /// A soft error: reported to the caller without failing the transport.
    pub fn error(message: impl Into<String>) -> Self {
        let mut data = Map::new();
        data.insert("error".to_string(), Value::String(message.into()));
        Self::with_data(data)
    }

    pub fn list(keys: Vec<String>) -> Self {
        let mut data = Map::new();
        data.insert(
            "keys".to_string(),
            Value::Array(keys.into_iter().map(Value::String).collect()),
        );
        Self::with_data(data)
    }

    pub fn is_error(&self) -> bool {
        self.data.len() == 1 && self.data.get("error").is_some_and(Value::is_string)
    }

    pub fn error_message(&self) -> Option<&str> {
        if self.is_error() {
            self.data.get("error").and_then(Value::as_str)
        } else {
            None
        }
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}
