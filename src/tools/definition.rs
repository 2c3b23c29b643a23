//! The tool contract and tool descriptors.
//!
//! Every Tool Module implements [`Tool`]: one entry operation taking a single
//! JSON object and resolving to either a result payload or a [`ToolError`].
//! The loader turns that into the uniform
//! [`InvocationResult`](crate::tools::InvocationResult), so a tool that fails
//! (or panics) never escapes as an uncaught fault.
//!
//! A [`ToolDescriptor`] is the registry's record of a tool: its name, version,
//! where the implementation lives and what input it accepts.

use crate::tools::error::ToolError;
use crate::tools::modules::EntryLocation;
use crate::tools::schema::InputSchema;
use futures::future::BoxFuture;
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use std::sync::{Arc, OnceLock};

/// The future returned by a tool's entry operation.
pub type ToolFuture = BoxFuture<'static, Result<Value, ToolError>>;

/// The universal calling convention for Tool Modules.
///
/// Implementations must not touch the registry or any other global state
/// beyond their declared effects (a timestamp tool may read the clock).
/// Errors are returned, not thrown; the loader additionally catches panics
/// and reports them as `ToolFault`.
///
/// # Example
///
/// ```rust
/// use toolsmith::tools::{Tool, ToolFuture};
/// use serde_json::Value;
///
/// #[derive(Debug)]
/// struct EchoTool;
///
/// impl Tool for EchoTool {
///     fn entry(&self, input: Value) -> ToolFuture {
///         Box::pin(async move { Ok(input) })
///     }
/// }
/// ```
pub trait Tool: Send + Sync + Debug {
    /// Runs the tool against already-validated input.
    fn entry(&self, input: Value) -> ToolFuture;
}

/// A shared, dynamically dispatched Tool Module.
pub type SharedTool = Arc<dyn Tool>;

/// Registry record identifying a tool implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique, stable registry key
    pub name: String,
    /// Semantic version; never decreases for a given name
    pub version: Version,
    /// Summary shown to the agent for tool selection
    #[serde(default)]
    pub description: String,
    /// Where the loader materializes the implementation from
    pub entry_location: String,
    /// Accepted input fields
    #[serde(default)]
    pub input_schema: InputSchema,
}

/// Pattern for tool names: lowercase kebab-case.
fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z][a-z0-9]*(-[a-z0-9]+)*$").expect("tool name pattern is a valid regex")
    })
}

impl ToolDescriptor {
    /// Creates a descriptor with an empty description and schema.
    #[must_use]
    pub fn new(name: impl Into<String>, version: Version, entry_location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version,
            description: String::new(),
            entry_location: entry_location.into(),
            input_schema: InputSchema::default(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the input schema.
    #[must_use]
    pub fn with_schema(mut self, schema: InputSchema) -> Self {
        self.input_schema = schema;
        self
    }

    /// Parses a version string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDescriptor` if `version` is not a semantic version.
    pub fn parse_version(version: &str) -> Result<Version, ToolError> {
        Version::parse(version.trim())
            .map_err(|e| ToolError::invalid_descriptor("version", format!("'{version}': {e}")))
    }

    /// Returns true if `name` is an acceptable tool name.
    #[must_use]
    pub fn is_valid_name(name: &str) -> bool {
        name_pattern().is_match(name)
    }

    /// Checks the descriptor's name and entry location.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDescriptor` naming the first bad field.
    pub fn validate(&self) -> Result<(), ToolError> {
        if !Self::is_valid_name(&self.name) {
            return Err(ToolError::invalid_descriptor(
                "name",
                format!(
                    "'{}' must be lowercase kebab-case (e.g. 'url-encoder')",
                    self.name
                ),
            ));
        }
        EntryLocation::parse(&self.entry_location)?;
        Ok(())
    }

    /// Returns the parsed entry location.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDescriptor` if the location string is malformed.
    pub fn location(&self) -> Result<EntryLocation, ToolError> {
        EntryLocation::parse(&self.entry_location)
    }

    /// Returns true if both descriptors point at the same implementation.
    #[must_use]
    pub fn same_implementation(&self, other: &Self) -> bool {
        self.entry_location == other.entry_location
    }

    /// Converts to the LLM-facing tool definition.
    #[must_use]
    pub fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.to_json_schema(),
        }
    }
}

/// Definition of a tool as presented to an LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The name of the tool
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON Schema for the tool's input parameters
    pub input_schema: Value,
}
