//! Declarative path routing for secrets engines.
//!
//! An engine is described as a `Backend`: a list of `Path`s (regex pattern,
//! field schema, one handler per `Operation`) plus the `Secret` types it can
//! lease. `Backend::handle_request` does the matching, field coercion and
//! create/update resolution so handlers only deal with storage.

pub mod backend;
pub mod field;
pub mod path;

pub use backend::{Backend, Secret};
pub use field::{FieldData, FieldSchema, FieldSchemas, FieldType};
pub use path::{
    ExistenceCheck, OperationHandler, Path, PathOperation, generic_name_regex, opt_slash,
};
