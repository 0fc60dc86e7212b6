use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

use crate::logical::Operation;

#[derive(Debug, ThisError)]
pub enum PluginError {
    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not marshal json for {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not decode JSON while fetching StorageEntry {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not {action} {key}: {source}")]
    Storage {
        action: &'static str,
        key: String,
        #[source]
        source: Box<PluginError>,
    },

    #[error("client token empty")]
    ClientTokenEmpty,

    #[error("unsupported path: {0}")]
    UnsupportedPath(String),

    #[error("unsupported operation {operation} on path {path}")]
    UnsupportedOperation { operation: Operation, path: String },

    #[error("unknown secret type: {0}")]
    UnknownSecretType(String),

    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("backend setup failed: {0}")]
    Setup(String),
}

impl PluginError {
    /// Attach the storage action and key to an error raised by a `Storage` call.
    pub fn storage(action: &'static str, key: impl Into<String>, source: PluginError) -> Self {
        PluginError::Storage {
            action,
            key: key.into(),
            source: Box::new(source),
        }
    }
}

impl IntoResponse for PluginError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match &self {
            PluginError::Database(_)
            | PluginError::Json(_)
            | PluginError::Encode { .. }
            | PluginError::Decode { .. }
            | PluginError::Storage { .. }
            | PluginError::Setup(_) => {
                tracing::error!(error = %self, "request failed with internal error");
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let body = ApiErrorBody {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                };
                (status, body)
            }
            PluginError::ClientTokenEmpty => (
                StatusCode::UNAUTHORIZED,
                ApiErrorBody {
                    code: "UNAUTHORIZED".to_string(),
                    message: self.to_string(),
                },
            ),
            PluginError::UnsupportedPath(_) => (
                StatusCode::NOT_FOUND,
                ApiErrorBody {
                    code: "UNSUPPORTED_PATH".to_string(),
                    message: self.to_string(),
                },
            ),
            PluginError::UnsupportedOperation { .. } => (
                StatusCode::METHOD_NOT_ALLOWED,
                ApiErrorBody {
                    code: "UNSUPPORTED_OPERATION".to_string(),
                    message: self.to_string(),
                },
            ),
            PluginError::UnknownSecretType(_)
            | PluginError::UnknownField(_)
            | PluginError::InvalidField { .. }
            | PluginError::InvalidBody(_) => (
                StatusCode::BAD_REQUEST,
                ApiErrorBody {
                    code: "INVALID_REQUEST".to_string(),
                    message: self.to_string(),
                },
            ),
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
