//! Tool parameter schema — a small JSON-Schema-shaped validator.
//!
//! Grounded on the hand-built `serde_json::json!({...})` schemas used
//! throughout the teacher's `src/tools/*.rs` (e.g. `task_create`'s
//! `parameters_schema`): rather than introduce an external schema crate, the
//! same shape is validated by a small recursive checker.

use serde_json::Value;
use std::collections::BTreeMap;

/// One property of an object schema.
#[derive(Debug, Clone)]
pub enum PropertyType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

#[derive(Debug, Clone)]
pub struct Property {
    pub ty: PropertyType,
    pub description: String,
}

/// A tool's parameter schema: a flat JSON-Schema object with typed
/// properties and a required-field list.
#[derive(Debug, Clone, Default)]
pub struct ParamSchema {
    pub properties: BTreeMap<String, Property>,
    pub required: Vec<String>,
}

/// One validation issue: (field path, message), per §4.1.
pub type Issue = (String, String);

/// A validation failure, carrying the full issues list.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<Issue>,
}

impl ValidationError {
    /// Render as `"field: message, field2: message2"`, the form the Agent
    /// Loop embeds in `"Invalid arguments: <...>"` tool-result content.
    pub fn describe(&self) -> String {
        self.issues
            .iter()
            .map(|(field, msg)| format!("{field}: {msg}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl ParamSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(
        mut self,
        name: impl Into<String>,
        ty: PropertyType,
        description: impl Into<String>,
    ) -> Self {
        self.properties.insert(
            name.into(),
            Property {
                ty,
                description: description.into(),
            },
        );
        self
    }

    pub fn required(mut self, names: impl IntoIterator<Item = &'static str>) -> Self {
        self.required = names.into_iter().map(String::from).collect();
        self
    }

    /// Produce the wire JSON-Schema form sent to the LLM (§4.1a).
    pub fn to_json_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        for (name, prop) in &self.properties {
            properties.insert(
                name.clone(),
                serde_json::json!({
                    "type": prop.ty.json_type_name(),
                    "description": prop.description,
                }),
            );
        }
        serde_json::json!({
            "type": "object",
            "properties": Value::Object(properties),
            "required": self.required,
        })
    }

    /// Validate and coerce an untyped argument map (§4.1b). On success,
    /// returns the map unchanged (no type coercion is currently needed for
    /// the supported primitive types — JSON's own typing already matches).
    pub fn validate(
        &self,
        args: &serde_json::Map<String, Value>,
    ) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        for field in &self.required {
            if !args.contains_key(field) {
                issues.push((field.clone(), "required field is missing".to_string()));
            }
        }

        for (name, value) in args {
            if let Some(prop) = self.properties.get(name) {
                if !prop.ty.matches(value) {
                    issues.push((
                        name.clone(),
                        format!("expected {}, got {}", prop.ty.json_type_name(), type_name(value)),
                    ));
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

impl PropertyType {
    fn json_type_name(&self) -> &'static str {
        match self {
            PropertyType::String => "string",
            PropertyType::Integer => "integer",
            PropertyType::Number => "number",
            PropertyType::Boolean => "boolean",
            PropertyType::Array => "array",
            PropertyType::Object => "object",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            PropertyType::String => value.is_string(),
            PropertyType::Integer => value.is_i64() || value.is_u64(),
            PropertyType::Number => value.is_number(),
            PropertyType::Boolean => value.is_boolean(),
            PropertyType::Array => value.is_array(),
            PropertyType::Object => value.is_object(),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
