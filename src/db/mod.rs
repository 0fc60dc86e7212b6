//! Database module: SQLite-backed `Storage` for engine entries.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows and conversions
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: the `Storage` implementation over a sqlx pool

pub mod models;
pub mod schema;
pub mod sqlite;

pub use models::DbEntry;
pub use schema::SQLITE_INIT;
pub use sqlite::{SqlitePool, SqliteStorage};
