//! # Toolsmith: a self-extending tool registry
//!
//! Agents discover tools by name, invoke them with JSON input, and author new
//! tools at runtime. A new tool becomes visible only after its own self-test
//! passes, and is persisted so later sessions see it.
//!
//! ## Architecture
//!
//! - **Tool contract**: every tool is a module exposing one async entry point
//!   taking JSON and returning JSON ([`tools::Tool`])
//! - **Registry**: name-keyed descriptors, published as immutable snapshots and
//!   persisted to TOML ([`tools::ToolRegistry`])
//! - **Loader**: resolves a name, validates input, runs the module with an
//!   optional timeout ([`tools::ToolLoader`])
//! - **Author**: drafts, self-tests and registers new tools ([`tools::ToolAuthor`])
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use toolsmith::prelude::*;
//!
//! let toolsmith = Toolsmith::builder().with_builtins().launch().await?;
//! let result = toolsmith
//!     .invoke("timestamp-converter", serde_json::json!({"timestamp": 1735689600}))
//!     .await;
//! assert_eq!(result.result.unwrap()["date"], "2025-01-01T00:00:00.000Z");
//! ```

pub mod config;
pub mod error;
pub mod facade;
pub mod logging;
pub mod tools;
pub mod types;

pub use error::{ToolsmithError, ToolsmithErrorKind};
pub use facade::{Toolsmith, ToolsmithBuilder};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{ToolManifest, ToolsmithConfig};
    pub use crate::error::{ToolsmithError, ToolsmithErrorKind};
    pub use crate::facade::{Toolsmith, ToolsmithBuilder};
    pub use crate::logging::{LogLevel, LoggingConfig};
    pub use crate::tools::{
        AuthoringReport, AuthoringState, FieldType, InputSchema, InvocationResult, InvokeOptions,
        SelfTestCase, Tool, ToolDescriptor, ToolDraft, ToolError, ToolErrorKind, ToolFuture,
    };
    pub use crate::types::AuthoringId;
}
