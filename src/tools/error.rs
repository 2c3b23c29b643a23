//! Tool error types.
//!
//! Errors raised while registering, validating, invoking and authoring tools.
//! Every kind has a stable short code (see [`ToolError::code`]) which is what
//! callers see in the `error` field of an
//! [`InvocationResult`](crate::tools::InvocationResult).

use std::fmt;
use std::time::Duration;

/// Errors that can occur in tool operations.
///
/// This type uses `Box<ToolErrorKind>` to keep the error size small,
/// enabling efficient use in Result types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    /// The specific error that occurred (boxed for size efficiency)
    kind: Box<ToolErrorKind>,
}

/// Specific tool error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolErrorKind {
    /// No tool by that name is registered
    NotFound {
        /// The name that failed to resolve
        tool_name: String,
    },
    /// Input failed the tool's declared schema
    ValidationError {
        /// The first offending field
        field: String,
        /// What was wrong with it
        reason: String,
    },
    /// The tool ran but failed, panicked, or returned a malformed result
    ToolFault {
        /// The name of the tool
        tool_name: String,
        /// Reason for failure
        reason: String,
    },
    /// A different implementation is already registered under this name
    DuplicateName {
        /// The contested name
        tool_name: String,
        /// Why the registration collided
        reason: String,
    },
    /// The invocation exceeded its timeout
    Timeout {
        /// The name of the tool
        tool_name: String,
        /// The timeout duration that was exceeded
        duration: Duration,
    },
    /// An authoring candidate failed verification
    SelfTestFailure {
        /// The candidate's intended name
        tool_name: String,
        /// Which case failed and how
        reason: String,
    },
    /// A descriptor is malformed (bad name, version or location)
    InvalidDescriptor {
        /// The offending descriptor field
        field: String,
        /// What was invalid
        reason: String,
    },
    /// Reading or writing the registry file failed
    Storage {
        /// Description of the storage error
        message: String,
    },
}

impl ToolError {
    /// Creates a new ToolError with the given kind.
    #[must_use]
    pub fn new(kind: ToolErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
        }
    }

    /// Returns a reference to the error kind.
    #[must_use]
    pub fn kind(&self) -> &ToolErrorKind {
        &self.kind
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(tool_name: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound {
            tool_name: tool_name.into(),
        })
    }

    /// Creates a validation error for a single field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::ValidationError {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// Creates a tool fault error.
    #[must_use]
    pub fn fault(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::ToolFault {
            tool_name: tool_name.into(),
            reason: reason.into(),
        })
    }

    /// Creates a duplicate name error.
    #[must_use]
    pub fn duplicate_name(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::DuplicateName {
            tool_name: tool_name.into(),
            reason: reason.into(),
        })
    }

    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(tool_name: impl Into<String>, duration: Duration) -> Self {
        Self::new(ToolErrorKind::Timeout {
            tool_name: tool_name.into(),
            duration,
        })
    }

    /// Creates a self-test failure error.
    #[must_use]
    pub fn self_test_failure(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::SelfTestFailure {
            tool_name: tool_name.into(),
            reason: reason.into(),
        })
    }

    /// Creates an invalid descriptor error.
    #[must_use]
    pub fn invalid_descriptor(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidDescriptor {
            field: field.into(),
            reason: reason.into(),
        })
    }

    /// Creates a storage error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Storage {
            message: message.into(),
        })
    }

    /// Returns the stable short code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self.kind.as_ref() {
            ToolErrorKind::NotFound { .. } => "NotFound",
            ToolErrorKind::ValidationError { .. } => "ValidationError",
            ToolErrorKind::ToolFault { .. } => "ToolFault",
            ToolErrorKind::DuplicateName { .. } => "DuplicateName",
            ToolErrorKind::Timeout { .. } => "Timeout",
            ToolErrorKind::SelfTestFailure { .. } => "SelfTestFailure",
            ToolErrorKind::InvalidDescriptor { .. } => "InvalidDescriptor",
            ToolErrorKind::Storage { .. } => "Storage",
        }
    }

    /// Returns the text placed in an invocation result's `error` field.
    ///
    /// `NotFound` and `Timeout` are reported as the bare code; everything else
    /// is `"<Code>: <detail>"`.
    #[must_use]
    pub fn result_message(&self) -> String {
        match self.kind.as_ref() {
            ToolErrorKind::NotFound { .. } | ToolErrorKind::Timeout { .. } => {
                self.code().to_string()
            }
            ToolErrorKind::ValidationError { field, reason } => {
                format!("{}: field '{}' {}", self.code(), field, reason)
            }
            ToolErrorKind::ToolFault { reason, .. }
            | ToolErrorKind::DuplicateName { reason, .. }
            | ToolErrorKind::SelfTestFailure { reason, .. }
            | ToolErrorKind::InvalidDescriptor { reason, .. } => {
                format!("{}: {}", self.code(), reason)
            }
            ToolErrorKind::Storage { message } => format!("{}: {}", self.code(), message),
        }
    }

    /// Returns true if this error indicates the tool was not found.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(*self.kind, ToolErrorKind::NotFound { .. })
    }

    /// Returns true if this error is a registration collision.
    #[must_use]
    pub fn is_duplicate_name(&self) -> bool {
        matches!(*self.kind, ToolErrorKind::DuplicateName { .. })
    }

    /// Returns true if this error is an input validation failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(*self.kind, ToolErrorKind::ValidationError { .. })
    }

    /// Returns true if this error is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(*self.kind, ToolErrorKind::Timeout { .. })
    }

    /// Returns true if this error is a tool fault.
    #[must_use]
    pub fn is_fault(&self) -> bool {
        matches!(*self.kind, ToolErrorKind::ToolFault { .. })
    }

    /// Returns true if retrying the same call could succeed.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            *self.kind,
            ToolErrorKind::Timeout { .. } | ToolErrorKind::Storage { .. }
        )
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind.as_ref() {
            ToolErrorKind::NotFound { tool_name } => {
                write!(
                    f,
                    "tool '{}' not found; list the registry or author the tool first",
                    tool_name
                )
            }
            ToolErrorKind::ValidationError { field, reason } => {
                write!(
                    f,
                    "input field '{}' {}; check the input against the tool's schema",
                    field, reason
                )
            }
            ToolErrorKind::ToolFault { tool_name, reason } => {
                write!(f, "tool '{}' faulted: {}", tool_name, reason)
            }
            ToolErrorKind::DuplicateName { tool_name, reason } => {
                write!(
                    f,
                    "tool '{}' is already registered: {}; choose a different name or bump the version",
                    tool_name, reason
                )
            }
            ToolErrorKind::Timeout {
                tool_name,
                duration,
            } => {
                write!(
                    f,
                    "tool '{}' timed out after {} ms",
                    tool_name,
                    duration.as_millis()
                )
            }
            ToolErrorKind::SelfTestFailure { tool_name, reason } => {
                write!(
                    f,
                    "self-test for candidate '{}' failed: {}",
                    tool_name, reason
                )
            }
            ToolErrorKind::InvalidDescriptor { field, reason } => {
                write!(f, "invalid tool descriptor field '{}': {}", field, reason)
            }
            ToolErrorKind::Storage { message } => {
                write!(f, "registry storage error: {}", message)
            }
        }
    }
}

impl std::error::Error for ToolError {}
