use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, put},
};
use std::sync::Arc;

use crate::handlers::engine::{
    delete_handler, health_handler, read_handler, renew_handler, revoke_handler, write_handler,
};
use crate::upcloud::UpcloudBackend;

/// Request bodies are small JSON objects; anything larger is rejected.
const BODY_LIMIT_BYTES: usize = 1024 * 1024;

#[derive(Clone)]
pub struct PluginState {
    pub backend: Arc<UpcloudBackend>,
    pub plugin_key: Arc<str>,
}

impl PluginState {
    pub fn new(backend: UpcloudBackend, plugin_key: impl Into<Arc<str>>) -> Self {
        Self {
            backend: Arc::new(backend),
            plugin_key: plugin_key.into(),
        }
    }
}

pub fn plugin_router(state: PluginState) -> Router {
    Router::new()
        .route("/sys/health", get(health_handler))
        .route(
            "/sys/leases/revoke",
            put(revoke_handler).post(revoke_handler),
        )
        .route("/sys/leases/renew", put(renew_handler).post(renew_handler))
        .route(
            "/v1/{*path}",
            get(read_handler)
                .post(write_handler)
                .put(write_handler)
                .delete(delete_handler),
        )
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .with_state(state)
}
