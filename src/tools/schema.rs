//! Declared input schemas and validation.
//!
//! A tool declares its accepted fields statically so the loader can reject
//! malformed input before the tool runs. Validation is permissive by default:
//! fields the schema does not mention are ignored unless the schema is marked
//! `strict`.

use crate::tools::error::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Type tag for a declared input field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// A JSON string
    String,
    /// Any JSON number
    Number,
    /// A JSON number with no fractional part
    Integer,
    /// `true` or `false`
    Boolean,
    /// A JSON object
    Object,
    /// A JSON array
    Array,
    /// Any non-null value
    Any,
}

impl FieldType {
    /// Returns the lowercase tag used in schemas and error messages.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Any => "any",
        }
    }

    /// Returns true if `value` is acceptable for this type.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::Any => !value.is_null(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of a single input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Accepted value type
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether the field must be present (and non-null)
    #[serde(default)]
    pub required: bool,
    /// Human-readable explanation shown to the agent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSpec {
    /// Creates a field declaration.
    #[must_use]
    pub fn new(field_type: FieldType, required: bool) -> Self {
        Self {
            field_type,
            required,
            description: None,
        }
    }

    /// Attaches a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The statically declared input shape of a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSchema {
    /// Reject fields the schema does not declare
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub strict: bool,
    /// Declared fields, ordered by name
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSpec>,
}

impl InputSchema {
    /// Creates an empty, permissive schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a required field.
    #[must_use]
    pub fn required(
        mut self,
        name: impl Into<String>,
        field_type: FieldType,
        description: impl Into<String>,
    ) -> Self {
        self.fields.insert(
            name.into(),
            FieldSpec::new(field_type, true).with_description(description),
        );
        self
    }

    /// Declares an optional field.
    #[must_use]
    pub fn optional(
        mut self,
        name: impl Into<String>,
        field_type: FieldType,
        description: impl Into<String>,
    ) -> Self {
        self.fields.insert(
            name.into(),
            FieldSpec::new(field_type, false).with_description(description),
        );
        self
    }

    /// Rejects undeclared fields.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Names of the required fields, in name order.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
    }

    /// Validates `input` against this schema.
    ///
    /// Declared fields are checked in name order, then (for strict schemas)
    /// undeclared ones; the first offending field is reported.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` naming the first offending field.
    pub fn validate(&self, input: &Value) -> Result<(), ToolError> {
        let Some(object) = input.as_object() else {
            return Err(ToolError::validation(
                "input",
                format!("must be a JSON object, got {}", json_type_name(input)),
            ));
        };

        for (name, spec) in &self.fields {
            match object.get(name) {
                None | Some(Value::Null) => {
                    if spec.required {
                        return Err(ToolError::validation(name, "is required"));
                    }
                }
                Some(value) if !spec.field_type.matches(value) => {
                    return Err(ToolError::validation(
                        name,
                        format!(
                            "expected {}, got {}",
                            spec.field_type,
                            json_type_name(value)
                        ),
                    ));
                }
                Some(_) => {}
            }
        }

        if self.strict {
            if let Some(extra) = object.keys().find(|key| !self.fields.contains_key(*key)) {
                return Err(ToolError::validation(
                    extra.as_str(),
                    "is not declared by the tool's schema",
                ));
            }
        }

        Ok(())
    }

    /// Renders this schema as JSON Schema for LLM tool definitions.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for (name, spec) in &self.fields {
            let mut property = Map::new();
            if spec.field_type != FieldType::Any {
                property.insert("type".to_string(), json!(spec.field_type.as_str()));
            }
            if let Some(ref description) = spec.description {
                property.insert("description".to_string(), json!(description));
            }
            properties.insert(name.clone(), Value::Object(property));
        }

        let required: Vec<&str> = self.required_fields().collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": !self.strict
        })
    }
}

/// Names the JSON type of a value for error messages.
#[must_use]
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
