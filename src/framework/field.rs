use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::PluginError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Int,
    Bool,
    Map,
}

impl FieldType {
    pub fn zero(&self) -> Value {
        match self {
            Self::String => Value::String(String::new()),
            Self::Int => Value::from(0),
            Self::Bool => Value::Bool(false),
            Self::Map => Value::Object(Map::new()),
        }
    }

    /// Coerce a raw request value into this type.
    fn coerce(&self, raw: &Value) -> Result<Value, String> {
        match (self, raw) {
            (Self::String, Value::String(_)) => Ok(raw.clone()),
            (Self::String, Value::Number(n)) => Ok(Value::String(n.to_string())),
            (Self::String, Value::Bool(b)) => Ok(Value::String(b.to_string())),

            (Self::Int, Value::Number(n)) => n
                .as_i64()
                .map(Value::from)
                .ok_or_else(|| format!("{n} is not an integer")),
            (Self::Int, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("cannot parse {s:?} as an integer")),

            (Self::Bool, Value::Bool(_)) => Ok(raw.clone()),
            (Self::Bool, Value::String(s)) => match s.trim() {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" => Ok(Value::Bool(false)),
                other => Err(format!("cannot parse {other:?} as a bool")),
            },

            (Self::Map, Value::Object(_)) => Ok(raw.clone()),

            (expected, got) => Err(format!("expected {expected:?}, got {}", type_name(got))),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub field_type: FieldType,
    pub required: bool,
    pub description: &'static str,
    pub default: Option<Value>,
}

impl FieldSchema {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            description: "",
            default: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub fn default_value(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    fn default_or_zero(&self) -> Value {
        self.default
            .clone()
            .unwrap_or_else(|| self.field_type.zero())
    }
}

pub type FieldSchemas = HashMap<String, FieldSchema>;

/// Request fields paired with the schema of the path that received them.
#[derive(Debug, Clone)]
pub struct FieldData {
    raw: Map<String, Value>,
    schema: FieldSchemas,
}

impl FieldData {
    pub fn new(raw: Map<String, Value>, schema: FieldSchemas) -> Self {
        Self { raw, schema }
    }

    fn schema_for(&self, name: &str) -> Result<&FieldSchema, PluginError> {
        self.schema
            .get(name)
            .ok_or_else(|| PluginError::UnknownField(name.to_string()))
    }

    /// The value the caller sent, coerced to the field's type.
    ///
    /// `Ok(None)` means the caller did not send the field (or sent `null`).
    pub fn get_ok(&self, name: &str) -> Result<Option<Value>, PluginError> {
        let schema = self.schema_for(name)?;
        match self.raw.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(raw) => schema
                .field_type
                .coerce(raw)
                .map(Some)
                .map_err(|reason| PluginError::InvalidField {
                    field: name.to_string(),
                    reason,
                }),
        }
    }

    /// The coerced value, or the schema default (zero value if none).
    pub fn get(&self, name: &str) -> Result<Value, PluginError> {
        let schema = self.schema_for(name)?;
        Ok(self
            .get_ok(name)?
            .unwrap_or_else(|| schema.default_or_zero()))
    }

    pub fn get_string(&self, name: &str) -> Result<String, PluginError> {
        Ok(match self.get(name)? {
            Value::String(s) => s,
            other => other.to_string(),
        })
    }

    /// Like `get_ok` but unwrapped to a string.
    pub fn get_string_ok(&self, name: &str) -> Result<Option<String>, PluginError> {
        Ok(self.get_ok(name)?.map(|value| match value {
            Value::String(s) => s,
            other => other.to_string(),
        }))
    }

    /// Check every sent field that has a schema, so handlers only ever see
    /// coercible input.
    pub fn validate(&self) -> Result<(), PluginError> {
        for name in self.raw.keys() {
            if self.schema.contains_key(name) {
                self.get_ok(name)?;
            }
        }
        Ok(())
    }

    /// Fields the caller sent that the path does not declare.
    pub fn unknown_fields(&self) -> Vec<&str> {
        let mut unknown: Vec<&str> = self
            .raw
            .keys()
            .filter(|k| !self.schema.contains_key(k.as_str()))
            .map(String::as_str)
            .collect();
        unknown.sort_unstable();
        unknown
    }
}
