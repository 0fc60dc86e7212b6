//! SQL DDL for initializing the entry storage.
//! SQLite-first design; can be adapted for other RDBMS.

/// SQLite schema with:
/// - `key` TEXT PRIMARY KEY (full storage path, e.g. `subaccount/alice`)
/// - `value` BLOB holding the encoded entry
/// - `updated_at` TEXT (RFC3339) refreshed on every upsert
pub const SQLITE_INIT: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    key TEXT PRIMARY KEY NOT NULL,
    value BLOB NOT NULL,
    updated_at TEXT NOT NULL -- RFC3339
);
"#;
