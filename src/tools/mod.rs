//! The tool system: contract, registry, loader and Author workflow.
//!
//! ## Architecture
//!
//! ```text
//! +-------------------------------------------------------------+
//! |                        ToolLoader                            |
//! |                                                              |
//! |  invoke(name, input)                                         |
//! |    --> ToolRegistry::lookup      (NotFound)                  |
//! |    --> InputSchema::validate     (ValidationError)           |
//! |    --> ModuleTable::materialize  --> Tool::entry on a task   |
//! |    --> InvocationResult          (ToolFault / Timeout)       |
//! +-------------------------------------------------------------+
//!                            ^
//!                            | register / register_bump / remove
//! +-------------------------------------------------------------+
//! |                        ToolAuthor                            |
//! |                                                              |
//! |  Drafting --> SelfTesting --> Registering --> Available      |
//! |        \__________\_______________\_____--> Rejected         |
//! +-------------------------------------------------------------+
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use toolsmith::tools::*;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(ToolRegistry::open(RegistryStore::new("tools/registry.toml")).await?);
//! let modules = Arc::new(ModuleTable::new());
//!
//! let builtins = BuiltinTools::all();
//! builtins.mount(&modules);
//! builtins.register(&registry).await?;
//!
//! let loader = ToolLoader::new(registry, modules);
//! let result = loader
//!     .invoke("url-encoder", serde_json::json!({"text": "hello world"}))
//!     .await;
//! assert!(result.success);
//! ```

pub mod author;
pub mod builtins;
pub mod definition;
pub mod error;
pub mod loader;
pub mod modules;
pub mod registry;
pub mod result;
pub mod schema;
pub mod script;
pub mod store;

// Re-exports
pub use author::{
    AuthoringReport, AuthoringState, SelfTestCase, ToolAuthor, ToolDraft, ToolSource,
    DEFAULT_SELF_TEST_TIMEOUT,
};
pub use builtins::{BuiltinTool, BuiltinTools};
pub use definition::{SharedTool, Tool, ToolDefinition, ToolDescriptor, ToolFuture};
pub use error::{ToolError, ToolErrorKind};
pub use loader::{run_module, InvokeOptions, ToolLoader};
pub use modules::{EntryLocation, ModuleTable};
pub use registry::{Registration, RegistryEntry, ToolListing, ToolRegistry};
pub use result::{normalize_raw, InvocationRequest, InvocationResult};
pub use schema::{FieldSpec, FieldType, InputSchema};
pub use script::ScriptTool;
pub use store::{render_markdown, RegistryStore};
