//! UpCloud secrets engine.
//!
//! Stores the operator's UpCloud API credentials under `config` and keeps a
//! local record per subaccount under `subaccount/<name>`. Subaccounts are not
//! provisioned against the UpCloud API yet, and revoking a `subaccount` lease
//! reports "Not implemented".

pub mod path_config;
pub mod path_subaccount;
pub mod secret_subaccount;

use std::sync::Arc;
use tracing::info;

use crate::error::PluginError;
use crate::framework::{Backend, Path};
use crate::logical::{BackendConfig, Operation, Request, Response, Storage};

pub use path_config::{CONFIG_KEY, UpcloudAuth, read_config};
pub use path_subaccount::{SUBACCOUNT_PREFIX, UpcloudSubaccount};
pub use secret_subaccount::SECRET_SUBACCOUNT_TYPE;

const UPCLOUD_HELP: &str = "\
The UpCloud secrets engine manages subaccounts on UpCloud.

Write the admin credentials to `config` first, then create subaccounts
under `subaccount/<name>`.";

/// The engine as mounted by the host: the path router plus the host wiring
/// it was set up with.
pub struct UpcloudBackend {
    backend: Backend,
    storage: Arc<dyn Storage>,
    mount_point: String,
}

/// Build and set up an engine instance; the host's entry point.
pub fn factory(conf: BackendConfig) -> Result<UpcloudBackend, PluginError> {
    let mount_point = normalize_mount_point(&conf.mount_point)?;

    let mut paths: Vec<Path> = Vec::new();
    paths.extend(path_config::config_paths().map_err(setup_error)?);
    paths.extend(path_subaccount::subaccount_paths().map_err(setup_error)?);

    let backend = Backend {
        help: UPCLOUD_HELP.to_string(),
        paths,
        secrets: vec![secret_subaccount::secret_subaccount(conf.default_lease_ttl)],
    };

    info!(mount_point = %mount_point, "upcloud secrets engine set up");

    Ok(UpcloudBackend {
        backend,
        storage: conf.storage,
        mount_point,
    })
}

fn setup_error(err: regex::Error) -> PluginError {
    PluginError::Setup(format!("invalid path pattern: {err}"))
}

fn normalize_mount_point(mount_point: &str) -> Result<String, PluginError> {
    let trimmed = mount_point.trim().trim_start_matches('/');
    if trimmed.is_empty() {
        return Err(PluginError::Setup("mount point must not be empty".to_string()));
    }
    if trimmed.ends_with('/') {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/"))
    }
}

impl UpcloudBackend {
    pub fn mount_point(&self) -> &str {
        &self.mount_point
    }

    pub fn storage(&self) -> Arc<dyn Storage> {
        self.storage.clone()
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Start a request against this mount, wired to its storage.
    pub fn request(&self, operation: Operation, path: impl Into<String>) -> Request {
        Request::new(operation, path, self.storage.clone()).with_mount_point(&self.mount_point)
    }

    pub async fn handle_request(&self, req: &Request) -> Result<Option<Response>, PluginError> {
        self.backend.handle_request(req).await
    }
}
