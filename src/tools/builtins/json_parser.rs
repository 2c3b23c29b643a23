//! JSON field extraction built-in tool.
//!
//! Parses a JSON document and optionally extracts the value at a dotted path.

use crate::tools::definition::{Tool, ToolDescriptor, ToolFuture};
use crate::tools::error::ToolError;
use crate::tools::modules::EntryLocation;
use crate::tools::schema::{FieldType, InputSchema};
use semver::Version;
use serde::Deserialize;
use serde_json::Value;

/// JSON parser tool executor.
#[derive(Debug, Default, Clone)]
pub struct JsonParserTool;

/// Arguments for the JSON parser tool.
#[derive(Debug, Deserialize)]
struct JsonParserArgs {
    /// JSON document text
    json: String,
    /// Dotted path such as `user.profile.settings.theme` or `items.0.id`
    #[serde(default)]
    path: Option<String>,
}

impl JsonParserTool {
    /// Registry name of this tool.
    pub const NAME: &'static str = "sample-json-parser";

    /// Creates a new JSON parser tool.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the descriptor for registration.
    #[must_use]
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            Self::NAME,
            Version::new(1, 0, 0),
            EntryLocation::builtin(Self::NAME).to_string(),
        )
        .with_description(
            "Parse a JSON string and optionally extract the value at a dotted path (array indices as numbers).",
        )
        .with_schema(
            InputSchema::new()
                .required("json", FieldType::String, "The JSON text to parse")
                .optional(
                    "path",
                    FieldType::String,
                    "Dotted path to extract, e.g. 'user.profile.settings.theme'",
                ),
        )
    }

    /// Walks `path` through `root`.
    fn extract<'a>(root: &'a Value, path: &str) -> Result<&'a Value, ToolError> {
        let mut current = root;
        let mut walked = Vec::new();

        for segment in path.split('.') {
            let next = match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            let Some(next) = next else {
                let location = if walked.is_empty() {
                    "the document root".to_string()
                } else {
                    format!("'{}'", walked.join("."))
                };
                return Err(ToolError::fault(
                    Self::NAME,
                    format!("path segment '{segment}' not found at {location}"),
                ));
            };
            walked.push(segment);
            current = next;
        }

        Ok(current)
    }
}

impl Tool for JsonParserTool {
    fn entry(&self, input: Value) -> ToolFuture {
        Box::pin(async move {
            let args: JsonParserArgs = serde_json::from_value(input)
                .map_err(|e| ToolError::validation("input", format!("invalid arguments: {e}")))?;

            let document: Value = serde_json::from_str(&args.json)
                .map_err(|e| ToolError::fault(Self::NAME, format!("invalid JSON: {e}")))?;

            match args.path.as_deref().map(str::trim) {
                None | Some("") => Ok(document),
                Some(path) => Self::extract(&document, path).cloned(),
            }
        })
    }
}
