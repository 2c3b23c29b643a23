//! Invocation request and result shapes.
//!
//! [`InvocationResult`] is the one shape every invocation returns regardless of
//! tool: exactly one of `result` / `error` is populated, and `tool` / `version`
//! identify the implementation that handled the call whenever a tool resolved.

use crate::tools::definition::ToolDescriptor;
use crate::tools::error::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A caller's request to run a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationRequest {
    /// Name of the tool to resolve
    pub tool_name: String,
    /// Field name to value mapping
    #[serde(default = "empty_object")]
    pub input: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl InvocationRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(tool_name: impl Into<String>, input: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            input,
        }
    }
}

/// The uniform outcome of an invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    /// Whether the tool produced a result
    pub success: bool,
    /// Tool-specific payload, present iff `success`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure message, present iff not `success`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Name of the descriptor that handled the call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Version of the descriptor that handled the call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl InvocationResult {
    /// A successful result attributed to `descriptor`.
    #[must_use]
    pub fn success(descriptor: &ToolDescriptor, result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
            tool: Some(descriptor.name.clone()),
            version: Some(descriptor.version.to_string()),
        }
    }

    /// A failure attributed to `descriptor`.
    #[must_use]
    pub fn failure(descriptor: &ToolDescriptor, error: &ToolError) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.result_message()),
            tool: Some(descriptor.name.clone()),
            version: Some(descriptor.version.to_string()),
        }
    }

    /// A failure where no tool resolved.
    #[must_use]
    pub fn unresolved(error: &ToolError) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.result_message()),
            tool: None,
            version: None,
        }
    }

    /// Returns true if the failure was a `NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.error.as_deref() == Some("NotFound")
    }

    /// Returns true if the failure was a `Timeout`.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.error.as_deref() == Some("Timeout")
    }

    /// Returns the error code portion of `error`, if any.
    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        self.error
            .as_deref()
            .map(|e| e.split_once(':').map_or(e, |(code, _)| code))
    }

    /// Converts into a standard `Result`, keeping the error text.
    ///
    /// # Errors
    ///
    /// Returns the `error` message when `success` is false.
    pub fn into_result(self) -> Result<Value, String> {
        if self.success {
            Ok(self.result.unwrap_or(Value::Null))
        } else {
            Err(self.error.unwrap_or_default())
        }
    }
}

/// Interprets a raw InvocationResult-shaped value produced by an out-of-process tool.
///
/// Accepts `{"success": true, "result": ...}` and
/// `{"success": false, "error": "..."}`; anything else is a `ToolFault`.
///
/// # Errors
///
/// Returns `ToolFault` if the tool reported failure or the shape is malformed.
pub fn normalize_raw(tool_name: &str, raw: Value) -> Result<Value, ToolError> {
    let Value::Object(mut object) = raw else {
        return Err(ToolError::fault(
            tool_name,
            "malformed result: expected a JSON object",
        ));
    };

    let Some(success) = object.get("success").and_then(Value::as_bool) else {
        return Err(ToolError::fault(
            tool_name,
            "malformed result: missing boolean 'success'",
        ));
    };

    let error = object.remove("error").filter(|e| !e.is_null());

    if success {
        if error.is_some() {
            return Err(ToolError::fault(
                tool_name,
                "malformed result: 'error' present on success",
            ));
        }
        object.remove("result").ok_or_else(|| {
            ToolError::fault(tool_name, "malformed result: missing 'result' on success")
        })
    } else {
        match error {
            Some(Value::String(message)) if !message.is_empty() => {
                Err(ToolError::fault(tool_name, message))
            }
            _ => Err(ToolError::fault(
                tool_name,
                "malformed result: failure without an 'error' message",
            )),
        }
    }
}
