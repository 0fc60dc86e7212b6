use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::error::PluginError;
use crate::framework::{FieldData, FieldSchema, FieldType, OperationHandler, Secret};
use crate::logical::{Request, Response};

pub const SECRET_SUBACCOUNT_TYPE: &str = "subaccount";

pub fn secret_subaccount(default_ttl: Duration) -> Secret {
    Secret::new(SECRET_SUBACCOUNT_TYPE, Arc::new(SubaccountRevoke))
        .field(
            "username",
            FieldSchema::new(FieldType::String)
                .required()
                .description("Username of the UpCloud subaccount."),
        )
        .default_ttl(default_ttl)
}

struct SubaccountRevoke;

#[async_trait]
impl OperationHandler for SubaccountRevoke {
    async fn handle(
        &self,
        _req: &Request,
        data: &FieldData,
    ) -> Result<Option<Response>, PluginError> {
        let username = data.get_string("username")?;
        if username.is_empty() {
            return Ok(Some(Response::error(
                "cannot revoke subaccount with an empty username",
            )));
        }

        warn!(subaccount = %username, "subaccount revocation requested but not implemented");
        Ok(Some(Response::error("Not implemented")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logical::{BackendConfig, InMemoryStorage, Operation, SecretLease};
    use crate::upcloud::{UpcloudBackend, factory};
    use serde_json::{Map, json};

    fn engine() -> UpcloudBackend {
        factory(BackendConfig {
            storage: Arc::new(InMemoryStorage::new()),
            mount_point: "upcloud/".into(),
            default_lease_ttl: Duration::from_secs(60),
        })
        .unwrap()
    }

    async fn revoke(b: &UpcloudBackend, internal: Map<String, serde_json::Value>) -> Response {
        let lease = SecretLease::new(SECRET_SUBACCOUNT_TYPE, internal);
        let req = b
            .request(Operation::Revoke, "")
            .with_client_token("root")
            .with_secret(lease);
        b.handle_request(&req).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn revoke_requires_username() {
        let b = engine();
        let resp = revoke(&b, Map::new()).await;
        assert_eq!(
            resp.error_message(),
            Some("cannot revoke subaccount with an empty username")
        );

        let mut internal = Map::new();
        internal.insert("username".into(), json!(""));
        let resp = revoke(&b, internal).await;
        assert_eq!(
            resp.error_message(),
            Some("cannot revoke subaccount with an empty username")
        );
    }

    #[tokio::test]
    async fn revoke_is_not_implemented() {
        let b = engine();
        let mut internal = Map::new();
        internal.insert("username".into(), json!("alice"));
        let resp = revoke(&b, internal).await;
        assert_eq!(resp.error_message(), Some("Not implemented"));
    }

    #[test]
    fn leases_are_not_renewable() {
        let secret = secret_subaccount(Duration::from_secs(30));
        let resp = secret.response(Map::new(), Map::new());
        let lease = resp.secret.unwrap();
        assert_eq!(lease.secret_type, SECRET_SUBACCOUNT_TYPE);
        assert_eq!(lease.ttl_secs, 30);
        assert!(!lease.renewable);
    }
}
