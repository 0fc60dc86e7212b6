use axum::Json;
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, StatusCode, request::Parts};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::router::PluginState;

/// Extract the caller's token.
/// Accepts either:
/// - Header: `x-vault-token: ...`
/// - Header: `Authorization: Bearer ...`
/// - Query string: `?token=...`
pub fn extract_token(headers: &HeaderMap, query: Option<&str>) -> Option<String> {
    // 1) header: x-vault-token
    if let Some(hv) = headers.get("x-vault-token").and_then(|v| v.to_str().ok())
        && !hv.is_empty()
    {
        return Some(hv.to_string());
    }

    // 2) header: Authorization: Bearer <token>
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        let auth = auth.trim();
        if let Some(token) = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            && !token.is_empty()
        {
            return Some(token.to_string());
        }
    }

    // 3) query: token=...
    query.and_then(|qs| {
        url::form_urlencoded::parse(qs.as_bytes())
            .find(|(k, v)| k == "token" && !v.is_empty())
            .map(|(_, v)| v.into_owned())
    })
}

/// Ensure the inbound request carries the configured plugin key.
pub fn ensure_authorized(
    headers: &HeaderMap,
    query: Option<&str>,
    expected: &str,
) -> Result<String, Response> {
    match extract_token(headers, query) {
        Some(token) if bool::from(token.as_bytes().ct_eq(expected.as_bytes())) => Ok(token),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"code": "UNAUTHORIZED", "message": "invalid or missing token"}})),
        )
            .into_response()),
    }
}

/// The authenticated client token, forwarded to the engine with the request.
#[derive(Debug, Clone)]
pub struct ClientToken(pub String);

impl FromRequestParts<PluginState> for ClientToken {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &PluginState,
    ) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;
        let query = parts.uri.query();
        ensure_authorized(headers, query, &state.plugin_key).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn header_wins_over_query() {
        let mut headers = HeaderMap::new();
        headers.insert("x-vault-token", HeaderValue::from_static("from-header"));
        assert_eq!(
            extract_token(&headers, Some("token=from-query")).as_deref(),
            Some("from-header")
        );
    }

    #[test]
    fn bearer_and_query_are_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc"));
        assert_eq!(extract_token(&headers, None).as_deref(), Some("abc"));

        let empty = HeaderMap::new();
        assert_eq!(
            extract_token(&empty, Some("list=true&token=xyz")).as_deref(),
            Some("xyz")
        );
        assert!(extract_token(&empty, Some("token=")).is_none());
    }

    #[test]
    fn wrong_token_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("x-vault-token", HeaderValue::from_static("nope"));
        let err = ensure_authorized(&headers, None, "secret").unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        headers.insert("x-vault-token", HeaderValue::from_static("secret"));
        assert_eq!(ensure_authorized(&headers, None, "secret").unwrap(), "secret");
    }
}
