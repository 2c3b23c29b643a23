//! Built-in tools.
//!
//! The sample Tool Modules that ship with toolsmith:
//!
//! - `sample-json-parser`: Parse JSON and extract a value by dotted path
//! - `timestamp-converter`: Convert Unix timestamps to dates and relative phrases
//! - `url-encoder`: Percent-encode and decode text
//!
//! ## Usage
//!
//! ```rust,ignore
//! use toolsmith::tools::builtins::BuiltinTools;
//!
//! let builtins = BuiltinTools::all();
//! builtins.mount(&modules);
//! builtins.register(&registry).await?;
//! ```

mod json_parser;
mod timestamp_converter;
mod url_encoder;

pub use json_parser::JsonParserTool;
pub use timestamp_converter::TimestampConverterTool;
pub use url_encoder::UrlEncoderTool;

use crate::tools::definition::{SharedTool, ToolDescriptor};
use crate::tools::error::ToolError;
use crate::tools::modules::{EntryLocation, ModuleTable};
use crate::tools::registry::{Registration, ToolRegistry};
use std::sync::Arc;

/// Returns the names of all available built-in tools.
#[must_use]
pub fn available_tools() -> &'static [&'static str] {
    &[
        JsonParserTool::NAME,
        TimestampConverterTool::NAME,
        UrlEncoderTool::NAME,
    ]
}

/// A built-in tool: its descriptor and module.
#[derive(Debug, Clone)]
pub struct BuiltinTool {
    /// Registry descriptor
    pub descriptor: ToolDescriptor,
    /// Module implementation
    pub module: SharedTool,
}

/// Set of built-in tools ready to mount and register.
#[derive(Debug, Clone, Default)]
pub struct BuiltinTools {
    tools: Vec<BuiltinTool>,
}

impl BuiltinTools {
    /// All built-in tools.
    #[must_use]
    pub fn all() -> Self {
        Self {
            tools: vec![
                BuiltinTool {
                    descriptor: JsonParserTool::descriptor(),
                    module: Arc::new(JsonParserTool::new()),
                },
                BuiltinTool {
                    descriptor: TimestampConverterTool::descriptor(),
                    module: Arc::new(TimestampConverterTool::new()),
                },
                BuiltinTool {
                    descriptor: UrlEncoderTool::descriptor(),
                    module: Arc::new(UrlEncoderTool::new()),
                },
            ],
        }
    }

    /// Only the named built-in tools.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a name that is not a built-in tool.
    pub fn select(names: &[&str]) -> Result<Self, ToolError> {
        let all = Self::all();
        let mut tools = Vec::with_capacity(names.len());
        for name in names {
            let tool = all
                .tools
                .iter()
                .find(|t| t.descriptor.name == *name)
                .ok_or_else(|| ToolError::not_found(*name))?;
            tools.push(tool.clone());
        }
        Ok(Self { tools })
    }

    /// The selected tools.
    #[must_use]
    pub fn tools(&self) -> &[BuiltinTool] {
        &self.tools
    }

    /// Mounts every module at its `builtin:` location.
    pub fn mount(&self, modules: &ModuleTable) {
        for tool in &self.tools {
            modules.mount(&EntryLocation::builtin(&tool.descriptor.name), tool.module.clone());
        }
    }

    /// Registers every descriptor. Already-registered identical descriptors are no-ops.
    ///
    /// # Errors
    ///
    /// Returns the first registration error, e.g. `DuplicateName` if a
    /// different tool has taken a built-in's name.
    pub async fn register(&self, registry: &ToolRegistry) -> Result<usize, ToolError> {
        let mut inserted = 0;
        for tool in &self.tools {
            if registry.register(tool.descriptor.clone()).await? == Registration::Inserted {
                inserted += 1;
            }
        }
        tracing::debug!(
            builtins = self.tools.len(),
            inserted,
            "Built-in tools registered"
        );
        Ok(inserted)
    }
}
