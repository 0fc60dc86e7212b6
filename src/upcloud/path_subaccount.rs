use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::PluginError;
use crate::framework::{
    FieldData, OperationHandler, Path, PathOperation, generic_name_regex, opt_slash,
};
use crate::logical::{Operation, Request, Response, StorageEntry};

/// Storage prefix for subaccount records.
pub const SUBACCOUNT_PREFIX: &str = "subaccount/";

/// A subaccount as UpCloud describes it. Only `username` is filled in locally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcloudSubaccount {
    pub username: String,
    pub password: String,
    pub allow_api: i64,
    pub phone: String,
    pub email: String,
}

pub fn subaccount_paths() -> Result<Vec<Path>, regex::Error> {
    let name = generic_name_regex("subaccount");
    Ok(vec![
        Path::new(format!("subaccount{}", opt_slash()))?.operation(
            Operation::List,
            PathOperation::new(Arc::new(SubaccountList), "List the stored UpCloud subaccounts."),
        ),
        Path::new(format!("subaccount/{name}"))?
            .operation(
                Operation::Create,
                PathOperation::new(Arc::new(SubaccountWrite), "Create an UpCloud subaccount record."),
            )
            .operation(
                Operation::Update,
                PathOperation::new(Arc::new(SubaccountWrite), "Create an UpCloud subaccount record."),
            ),
        Path::new(format!("subaccount/{name}/token"))?.operation(
            Operation::Read,
            PathOperation::new(
                Arc::new(SubaccountTokenRead),
                "Retrieve the UpCloud subaccount credentials.",
            ),
        ),
    ])
}

struct SubaccountWrite;

#[async_trait]
impl OperationHandler for SubaccountWrite {
    async fn handle(
        &self,
        req: &Request,
        data: &FieldData,
    ) -> Result<Option<Response>, PluginError> {
        let name = data.get_string("subaccount")?;
        let subaccount = UpcloudSubaccount {
            username: name.clone(),
            ..UpcloudSubaccount::default()
        };

        let key = format!("{SUBACCOUNT_PREFIX}{name}");
        let entry = StorageEntry::json(&key, &subaccount)?;
        req.storage()
            .put(entry)
            .await
            .map_err(|e| PluginError::storage("put subaccount to", key, e))?;

        info!(subaccount = %name, "stored subaccount record");
        Ok(None)
    }
}

struct SubaccountList;

#[async_trait]
impl OperationHandler for SubaccountList {
    async fn handle(
        &self,
        req: &Request,
        _data: &FieldData,
    ) -> Result<Option<Response>, PluginError> {
        let keys = req
            .storage()
            .list(SUBACCOUNT_PREFIX)
            .await
            .map_err(|e| PluginError::storage("list", SUBACCOUNT_PREFIX, e))?;
        Ok(Some(Response::list(keys)))
    }
}

// TODO: issue subaccount credentials with a `subaccount` lease once creation
// goes through the UpCloud API.
struct SubaccountTokenRead;

#[async_trait]
impl OperationHandler for SubaccountTokenRead {
    async fn handle(
        &self,
        _req: &Request,
        _data: &FieldData,
    ) -> Result<Option<Response>, PluginError> {
        Ok(None)
    }
}
