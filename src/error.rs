//! Crate-level error types.
//!
//! Tool operations report [`ToolError`](crate::tools::ToolError); this module
//! holds the error seen by the facade and the CLI, which also covers
//! configuration, logging, and launch failures.
//!
//! No external error crates (anyhow, thiserror, eyre) are used.

use crate::tools::ToolError;
use std::fmt;

/// Errors surfaced by [`Toolsmith`](crate::Toolsmith) and the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolsmithError {
    /// The specific error that occurred
    pub kind: ToolsmithErrorKind,
}

/// Specific toolsmith error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolsmithErrorKind {
    /// Configuration could not be read or is invalid
    Configuration {
        /// The offending field or file
        field: String,
        /// Why it was rejected
        reason: String,
    },
    /// Logging could not be initialized
    Logging {
        /// Why initialization failed
        reason: String,
    },
    /// Opening the registry or mounting builtins failed
    LaunchFailed {
        /// Why the launch failed
        reason: String,
    },
    /// A tool operation failed
    Tool(ToolError),
    /// A file outside the registry could not be read
    Io {
        /// The file involved
        path: String,
        /// The underlying error message
        reason: String,
    },
}

impl ToolsmithError {
    /// Creates a new ToolsmithError with the given kind.
    #[must_use]
    pub fn new(kind: ToolsmithErrorKind) -> Self {
        Self { kind }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ToolsmithErrorKind::Configuration {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// Creates a logging error.
    #[must_use]
    pub fn logging(reason: impl Into<String>) -> Self {
        Self::new(ToolsmithErrorKind::Logging {
            reason: reason.into(),
        })
    }

    /// Creates a launch failed error.
    #[must_use]
    pub fn launch_failed(reason: impl Into<String>) -> Self {
        Self::new(ToolsmithErrorKind::LaunchFailed {
            reason: reason.into(),
        })
    }

    /// Creates an I/O error for `path`.
    #[must_use]
    pub fn io(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ToolsmithErrorKind::Io {
            path: path.into(),
            reason: reason.into(),
        })
    }

    /// Returns the wrapped tool error, if any.
    #[must_use]
    pub fn as_tool_error(&self) -> Option<&ToolError> {
        match self.kind {
            ToolsmithErrorKind::Tool(ref e) => Some(e),
            _ => None,
        }
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self.kind, ToolsmithErrorKind::Configuration { .. })
    }
}

impl fmt::Display for ToolsmithError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ToolsmithErrorKind::Configuration { field, reason } => {
                write!(
                    f,
                    "invalid configuration for '{}': {}; check toolsmith.toml",
                    field, reason
                )
            }
            ToolsmithErrorKind::Logging { reason } => {
                write!(f, "failed to initialize logging: {}", reason)
            }
            ToolsmithErrorKind::LaunchFailed { reason } => {
                write!(f, "failed to launch toolsmith: {}", reason)
            }
            ToolsmithErrorKind::Tool(e) => write!(f, "{}", e),
            ToolsmithErrorKind::Io { path, reason } => {
                write!(f, "failed to read '{}': {}", path, reason)
            }
        }
    }
}

impl std::error::Error for ToolsmithError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ToolsmithErrorKind::Tool(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ToolError> for ToolsmithError {
    fn from(error: ToolError) -> Self {
        Self::new(ToolsmithErrorKind::Tool(error))
    }
}
