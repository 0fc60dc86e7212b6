use axum::{
    Json,
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use tracing::info;

use crate::error::{ApiErrorBody, ApiErrorResponse};
use crate::logical::{self, Operation, SecretLease};
use crate::middleware::auth::ClientToken;
use crate::{PluginError, VERSION, router::PluginState};

/// GET /sys/health -> liveness plus the mount this process serves.
pub async fn health_handler(State(state): State<PluginState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": VERSION,
        "mount_point": state.backend.mount_point(),
    }))
}

/// GET /v1/{*path} -> read; `?list=true` lists, `?help=1` describes the path.
pub async fn read_handler(
    State(state): State<PluginState>,
    ClientToken(token): ClientToken,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Response, PluginError> {
    let operation = if query_flag(query.as_deref(), "help") {
        Operation::Help
    } else if query_flag(query.as_deref(), "list") {
        Operation::List
    } else {
        Operation::Read
    };
    dispatch(&state, token, operation, path, Map::new()).await
}

/// POST|PUT /v1/{*path} -> create or update, decided by the path's existence check.
pub async fn write_handler(
    State(state): State<PluginState>,
    ClientToken(token): ClientToken,
    Path(path): Path<String>,
    body: Bytes,
) -> Result<Response, PluginError> {
    let data = parse_body(&body)?;
    dispatch(&state, token, Operation::Create, path, data).await
}

/// DELETE /v1/{*path}
pub async fn delete_handler(
    State(state): State<PluginState>,
    ClientToken(token): ClientToken,
    Path(path): Path<String>,
) -> Result<Response, PluginError> {
    dispatch(&state, token, Operation::Delete, path, Map::new()).await
}

/// PUT /sys/leases/revoke -> run the revoke callback of the lease's secret type.
pub async fn revoke_handler(
    State(state): State<PluginState>,
    ClientToken(token): ClientToken,
    body: Bytes,
) -> Result<Response, PluginError> {
    let lease = parse_lease(&body)?;
    info!(secret_type = %lease.recorded_type(), "lease revocation requested");
    lease_operation(&state, token, Operation::Revoke, lease).await
}

/// PUT /sys/leases/renew
pub async fn renew_handler(
    State(state): State<PluginState>,
    ClientToken(token): ClientToken,
    body: Bytes,
) -> Result<Response, PluginError> {
    let lease = parse_lease(&body)?;
    lease_operation(&state, token, Operation::Renew, lease).await
}

async fn dispatch(
    state: &PluginState,
    token: String,
    operation: Operation,
    path: String,
    data: Map<String, Value>,
) -> Result<Response, PluginError> {
    let req = state
        .backend
        .request(operation, path.trim_start_matches('/'))
        .with_client_token(token)
        .with_data(data);
    let resp = state.backend.handle_request(&req).await?;
    Ok(render(resp))
}

async fn lease_operation(
    state: &PluginState,
    token: String,
    operation: Operation,
    lease: SecretLease,
) -> Result<Response, PluginError> {
    let req = state
        .backend
        .request(operation, "")
        .with_client_token(token)
        .with_secret(lease);
    let resp = state.backend.handle_request(&req).await?;
    Ok(render(resp))
}

fn render(resp: Option<logical::Response>) -> Response {
    match resp {
        None => StatusCode::NO_CONTENT.into_response(),
        Some(resp) => match resp.error_message() {
            Some(message) => (
                StatusCode::BAD_REQUEST,
                Json(ApiErrorResponse {
                    error: ApiErrorBody {
                        code: "INVALID_REQUEST".to_string(),
                        message: message.to_string(),
                    },
                }),
            )
                .into_response(),
            None => Json(resp).into_response(),
        },
    }
}

fn parse_body(body: &[u8]) -> Result<Map<String, Value>, PluginError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(PluginError::InvalidBody(
            "expected a JSON object".to_string(),
        )),
        Err(e) => Err(PluginError::InvalidBody(e.to_string())),
    }
}

fn parse_lease(body: &[u8]) -> Result<SecretLease, PluginError> {
    serde_json::from_slice(body).map_err(|e| PluginError::InvalidBody(e.to_string()))
}

fn query_flag(query: Option<&str>, name: &str) -> bool {
    query.is_some_and(|qs| {
        url::form_urlencoded::parse(qs.as_bytes())
            .any(|(k, v)| k == name && matches!(v.as_ref(), "" | "1" | "true"))
    })
}
