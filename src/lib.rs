pub mod config;
pub mod db;
pub mod error;
pub mod framework;
pub mod handlers;
pub mod logical;
pub mod middleware;
pub mod router;
pub mod upcloud;

pub use error::PluginError;
pub use upcloud::{UpcloudBackend, factory};

/// Crate version reported by the health endpoint.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
