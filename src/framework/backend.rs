use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::field::{FieldData, FieldSchema, FieldSchemas};
use super::path::{OperationHandler, Path};
use crate::error::PluginError;
use crate::logical::{Operation, Request, Response, SecretLease};

/// A lease-bearing secret type and its lifecycle callbacks.
pub struct Secret {
    pub secret_type: &'static str,
    pub fields: FieldSchemas,
    pub revoke: Arc<dyn OperationHandler>,
    pub renew: Option<Arc<dyn OperationHandler>>,
    pub default_ttl: Duration,
}

impl Secret {
    pub fn new(secret_type: &'static str, revoke: Arc<dyn OperationHandler>) -> Self {
        Self {
            secret_type,
            fields: FieldSchemas::new(),
            revoke,
            renew: None,
            default_ttl: Duration::ZERO,
        }
    }

    pub fn field(mut self, name: &str, schema: FieldSchema) -> Self {
        self.fields.insert(name.to_string(), schema);
        self
    }

    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Build a response that carries a lease of this type.
    pub fn response(&self, data: Map<String, Value>, internal: Map<String, Value>) -> Response {
        let mut lease = SecretLease::new(self.secret_type, internal);
        lease.ttl_secs = self.default_ttl.as_secs();
        lease.renewable = self.renew.is_some();
        Response {
            data,
            secret: Some(lease),
            warnings: Vec::new(),
        }
    }
}

/// Routes requests to the path or secret callback that owns them.
pub struct Backend {
    pub help: String,
    pub paths: Vec<Path>,
    pub secrets: Vec<Secret>,
}

impl Backend {
    pub fn secret(&self, secret_type: &str) -> Option<&Secret> {
        self.secrets.iter().find(|s| s.secret_type == secret_type)
    }

    fn route(&self, path: &str) -> Option<(&Path, Map<String, Value>)> {
        self.paths
            .iter()
            .find_map(|p| p.captures(path).map(|caps| (p, caps)))
    }

    pub async fn handle_request(&self, req: &Request) -> Result<Option<Response>, PluginError> {
        if req.client_token.is_empty() {
            return Err(PluginError::ClientTokenEmpty);
        }

        debug!(operation = %req.operation, path = %req.path, "handling request");

        match req.operation {
            Operation::Revoke | Operation::Renew => return self.handle_secret(req).await,
            Operation::Help => return self.handle_help(req),
            _ => {}
        }

        let (path, captures) = self
            .route(&req.path)
            .ok_or_else(|| PluginError::UnsupportedPath(req.path.clone()))?;
        let data = path.field_data(&req.data, captures);

        if let Err(err) = data.validate() {
            return invalid_input(err);
        }

        let operation = match req.operation {
            Operation::Create | Operation::Update => match path.existence() {
                Some(check) => {
                    if check.exists(req, &data).await? {
                        Operation::Update
                    } else {
                        Operation::Create
                    }
                }
                None => Operation::Update,
            },
            other => other,
        };

        let op = path
            .operations()
            .get(&operation)
            .ok_or_else(|| PluginError::UnsupportedOperation {
                operation,
                path: req.path.clone(),
            })?;

        let mut resp = match op.handler.handle(req, &data).await {
            Err(err @ (PluginError::InvalidField { .. } | PluginError::UnknownField(_))) => {
                return invalid_input(err);
            }
            other => other?,
        };

        let unknown = data.unknown_fields();
        if !unknown.is_empty()
            && let Some(resp) = resp.as_mut().filter(|r| !r.is_error())
        {
            resp.add_warning(format!(
                "Endpoint ignored these unrecognized parameters: {unknown:?}"
            ));
        }

        Ok(resp)
    }

    async fn handle_secret(&self, req: &Request) -> Result<Option<Response>, PluginError> {
        let lease = req
            .secret
            .as_ref()
            .ok_or_else(|| PluginError::UnknownSecretType(String::new()))?;
        let secret_type = lease.recorded_type();
        let secret = self
            .secret(secret_type)
            .ok_or_else(|| PluginError::UnknownSecretType(secret_type.to_string()))?;

        let data = FieldData::new(lease.internal_data.clone(), secret.fields.clone());
        let handler = match req.operation {
            Operation::Revoke => &secret.revoke,
            _ => secret
                .renew
                .as_ref()
                .ok_or_else(|| PluginError::UnsupportedOperation {
                    operation: req.operation,
                    path: secret_type.to_string(),
                })?,
        };

        match handler.handle(req, &data).await {
            Err(err @ (PluginError::InvalidField { .. } | PluginError::UnknownField(_))) => {
                invalid_input(err)
            }
            other => other,
        }
    }

    fn handle_help(&self, req: &Request) -> Result<Option<Response>, PluginError> {
        let mut help = self.help.clone();
        if let Some((path, _)) = self.route(&req.path) {
            help.push_str("\n\n## PATH ");
            help.push_str(path.pattern());
            if !path.help_text().is_empty() {
                help.push_str("\n\n");
                help.push_str(path.help_text());
            }
            let mut ops: Vec<_> = path.operations().iter().collect();
            ops.sort_by_key(|(op, _)| op.as_str());
            for (op, details) in ops {
                help.push_str(&format!("\n  {op}: {}", details.summary));
            }
            let mut fields: Vec<_> = path.fields().iter().collect();
            fields.sort_by_key(|(name, _)| name.as_str());
            for (name, schema) in fields {
                help.push_str(&format!("\n  field {name}: {}", schema.description));
            }
        }

        let mut data = Map::new();
        data.insert("help".to_string(), Value::String(help));
        Ok(Some(Response::with_data(data)))
    }
}

fn invalid_input(err: PluginError) -> Result<Option<Response>, PluginError> {
    warn!(error = %err, "rejecting request with invalid fields");
    Ok(Some(Response::error(err.to_string())))
}
