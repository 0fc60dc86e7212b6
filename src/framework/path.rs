use async_trait::async_trait;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use super::field::{FieldData, FieldSchema, FieldSchemas, FieldType};
use crate::error::PluginError;
use crate::logical::{Operation, Request, Response};

/// Pattern for a single path segment naming an object, captured as `name`.
pub fn generic_name_regex(name: &str) -> String {
    format!(r"(?P<{name}>\w(([\w\-.]+)?\w)?)")
}

/// Pattern matching an optional trailing slash.
pub fn opt_slash() -> &'static str {
    "/?"
}

#[async_trait]
pub trait OperationHandler: Send + Sync {
    async fn handle(
        &self,
        req: &Request,
        data: &FieldData,
    ) -> Result<Option<Response>, PluginError>;
}

/// Decides whether a write is a create or an update.
#[async_trait]
pub trait ExistenceCheck: Send + Sync {
    async fn exists(&self, req: &Request, data: &FieldData) -> Result<bool, PluginError>;
}

#[derive(Clone)]
pub struct PathOperation {
    pub handler: Arc<dyn OperationHandler>,
    pub summary: &'static str,
}

impl PathOperation {
    pub fn new(handler: Arc<dyn OperationHandler>, summary: &'static str) -> Self {
        Self { handler, summary }
    }
}

pub struct Path {
    pattern: String,
    regex: Regex,
    fields: FieldSchemas,
    operations: HashMap<Operation, PathOperation>,
    existence_check: Option<Arc<dyn ExistenceCheck>>,
    help: &'static str,
}

impl Path {
    /// Compile `pattern` (anchored on both ends).
    ///
    /// Named capture groups become required `String` fields; `field` can
    /// override them.
    pub fn new(pattern: impl Into<String>) -> Result<Self, regex::Error> {
        let pattern = pattern.into();
        let regex = Regex::new(&format!("^{pattern}$"))?;
        let fields = regex
            .capture_names()
            .flatten()
            .map(|name| {
                (
                    name.to_string(),
                    FieldSchema::new(FieldType::String).required(),
                )
            })
            .collect();
        Ok(Self {
            pattern,
            regex,
            fields,
            operations: HashMap::new(),
            existence_check: None,
            help: "",
        })
    }

    pub fn field(mut self, name: &str, schema: FieldSchema) -> Self {
        self.fields.insert(name.to_string(), schema);
        self
    }

    pub fn operation(mut self, op: Operation, operation: PathOperation) -> Self {
        self.operations.insert(op, operation);
        self
    }

    pub fn existence_check(mut self, check: Arc<dyn ExistenceCheck>) -> Self {
        self.existence_check = Some(check);
        self
    }

    pub fn help(mut self, help: &'static str) -> Self {
        self.help = help;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn fields(&self) -> &FieldSchemas {
        &self.fields
    }

    pub fn operations(&self) -> &HashMap<Operation, PathOperation> {
        &self.operations
    }

    pub fn has_existence_check(&self) -> bool {
        self.existence_check.is_some()
    }

    pub(crate) fn existence(&self) -> Option<&Arc<dyn ExistenceCheck>> {
        self.existence_check.as_ref()
    }

    pub fn help_text(&self) -> &'static str {
        self.help
    }

    /// Captured path parameters, or `None` when the path does not match.
    pub fn captures(&self, path: &str) -> Option<Map<String, Value>> {
        let caps = self.regex.captures(path)?;
        Some(
            self.regex
                .capture_names()
                .flatten()
                .filter_map(|name| {
                    caps.name(name)
                        .map(|m| (name.to_string(), Value::String(m.as_str().to_string())))
                })
                .collect(),
        )
    }

    /// Merge body data with captured parameters (captures win).
    pub fn field_data(&self, body: &Map<String, Value>, captures: Map<String, Value>) -> FieldData {
        let mut raw = body.clone();
        raw.extend(captures);
        FieldData::new(raw, self.fields.clone())
    }
}
