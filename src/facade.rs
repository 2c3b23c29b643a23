//! High-level facade for toolsmith.
//!
//! Wires the registry, module table, loader and author together so callers
//! only deal with tool names, inputs and drafts.
//!
//! # Example
//!
//! ```rust,ignore
//! use toolsmith::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), ToolsmithError> {
//!     let toolsmith = Toolsmith::builder()
//!         .registry_path("tools/registry.toml")
//!         .with_builtins()
//!         .launch()
//!         .await?;
//!
//!     let result = toolsmith
//!         .invoke("url-encoder", serde_json::json!({"text": "a b"}))
//!         .await;
//!     println!("{}", serde_json::to_string_pretty(&result).unwrap_or_default());
//!     Ok(())
//! }
//! ```

use crate::config::ToolsmithConfig;
use crate::error::ToolsmithError;
use crate::tools::{
    AuthoringReport, BuiltinTools, InvocationResult, InvokeOptions, ModuleTable, RegistryStore,
    ToolAuthor, ToolDefinition, ToolDescriptor, ToolDraft, ToolListing, ToolLoader, ToolRegistry,
};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// A running tool registry with its loader and Author workflow.
pub struct Toolsmith {
    registry: Arc<ToolRegistry>,
    modules: Arc<ModuleTable>,
    loader: ToolLoader,
    author: ToolAuthor,
}

impl std::fmt::Debug for Toolsmith {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolsmith")
            .field("tools", &self.registry.len())
            .field("modules", &self.modules.len())
            .finish_non_exhaustive()
    }
}

impl Toolsmith {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> ToolsmithBuilder {
        ToolsmithBuilder::default()
    }

    /// Invokes a tool by name with the default options.
    ///
    /// Never fails: every outcome, including an unknown name, is an
    /// [`InvocationResult`].
    pub async fn invoke(&self, tool_name: &str, input: Value) -> InvocationResult {
        self.loader.invoke(tool_name, input).await
    }

    /// Invokes a tool with per-call options.
    pub async fn invoke_with(
        &self,
        tool_name: &str,
        input: Value,
        options: InvokeOptions,
    ) -> InvocationResult {
        self.loader.invoke_with(tool_name, input, options).await
    }

    /// Runs the Author workflow for a draft.
    pub async fn author(&self, draft: ToolDraft) -> AuthoringReport {
        self.author.author(draft).await
    }

    /// Removes a tool and its authored files.
    ///
    /// # Errors
    ///
    /// Returns the wrapped `NotFound` if no tool has that name, or `Storage`
    /// if the registry cannot be persisted.
    pub async fn retire(&self, name: &str) -> Result<ToolDescriptor, ToolsmithError> {
        Ok(self.author.retire(name).await?)
    }

    /// The registered tools, in registration order.
    #[must_use]
    pub fn list(&self) -> ToolListing {
        self.registry.list()
    }

    /// Looks up a descriptor by name.
    ///
    /// # Errors
    ///
    /// Returns the wrapped `NotFound` if no tool has that name.
    pub fn lookup(&self, name: &str) -> Result<ToolDescriptor, ToolsmithError> {
        Ok(self.registry.lookup(name)?)
    }

    /// Registered names similar to `name`.
    #[must_use]
    pub fn suggest(&self, name: &str) -> Vec<String> {
        self.registry.suggest(name)
    }

    /// LLM-facing definitions of every registered tool.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry
            .list()
            .iter()
            .map(ToolDescriptor::to_definition)
            .collect()
    }

    /// The Markdown view of the registry.
    #[must_use]
    pub fn render_registry(&self) -> String {
        self.registry.render_markdown()
    }

    /// The underlying registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// The module table, for mounting native modules directly.
    #[must_use]
    pub fn modules(&self) -> &Arc<ModuleTable> {
        &self.modules
    }

    /// The loader.
    #[must_use]
    pub fn loader(&self) -> &ToolLoader {
        &self.loader
    }
}

/// Builder for [`Toolsmith`].
///
/// Explicit setters override the matching [`ToolsmithConfig`] values.
#[derive(Debug, Default)]
pub struct ToolsmithBuilder {
    config: Option<ToolsmithConfig>,
    registry_path: Option<PathBuf>,
    markdown_path: Option<PathBuf>,
    in_memory: bool,
    tools_dir: Option<PathBuf>,
    default_timeout: Option<Duration>,
    self_test_timeout: Option<Duration>,
    builtins: bool,
}

impl ToolsmithBuilder {
    /// Uses values from a loaded configuration.
    #[must_use]
    pub fn config(mut self, config: ToolsmithConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Persists the registry at `path`.
    ///
    /// The Markdown view is then written only if [`markdown_path`](Self::markdown_path)
    /// is also set.
    #[must_use]
    pub fn registry_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.registry_path = Some(path.into());
        self
    }

    /// Writes the Markdown view to `path` after each change.
    #[must_use]
    pub fn markdown_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.markdown_path = Some(path.into());
        self
    }

    /// Keeps the registry in memory only.
    #[must_use]
    pub fn in_memory(mut self) -> Self {
        self.in_memory = true;
        self
    }

    /// Directory authored scripts are written under.
    #[must_use]
    pub fn tools_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.tools_dir = Some(path.into());
        self
    }

    /// Timeout for invocations that do not set their own.
    #[must_use]
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Limit for each self-test case.
    #[must_use]
    pub fn self_test_timeout(mut self, timeout: Duration) -> Self {
        self.self_test_timeout = Some(timeout);
        self
    }

    /// Mounts and registers the built-in tools at launch.
    #[must_use]
    pub fn with_builtins(mut self) -> Self {
        self.builtins = true;
        self
    }

    /// Opens the registry and wires everything together.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid configuration and
    /// `LaunchFailed` if the registry cannot be loaded or a built-in name is
    /// taken by another tool.
    pub async fn launch(self) -> Result<Toolsmith, ToolsmithError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let registry = if self.in_memory {
            ToolRegistry::in_memory()
        } else {
            let (path, markdown) = match self.registry_path {
                Some(path) => (path, self.markdown_path),
                None => (
                    config.registry.path.clone(),
                    self.markdown_path.or_else(|| config.registry.markdown.clone()),
                ),
            };
            let mut store = RegistryStore::new(path);
            if let Some(markdown) = markdown {
                store = store.with_markdown(markdown);
            }
            ToolRegistry::open(store)
                .await
                .map_err(|e| ToolsmithError::launch_failed(e.to_string()))?
        };
        let registry = Arc::new(registry);
        let modules = Arc::new(ModuleTable::new());

        if self.builtins {
            let builtins = BuiltinTools::all();
            builtins.mount(&modules);
            builtins
                .register(&registry)
                .await
                .map_err(|e| ToolsmithError::launch_failed(e.to_string()))?;
        }

        let loader = ToolLoader::new(Arc::clone(&registry), Arc::clone(&modules))
            .with_default_timeout(
                self.default_timeout
                    .or_else(|| config.invocation.default_timeout()),
            );

        let tools_dir = self
            .tools_dir
            .unwrap_or_else(|| config.authoring.tools_dir.clone());
        let author = ToolAuthor::new(Arc::clone(&registry), Arc::clone(&modules), tools_dir)
            .with_self_test_timeout(
                self.self_test_timeout
                    .or_else(|| config.authoring.self_test_timeout()),
            );

        tracing::info!(
            tools_count = registry.len(),
            modules_count = modules.len(),
            "Toolsmith launched"
        );

        Ok(Toolsmith {
            registry,
            modules,
            loader,
            author,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{SelfTestCase, Tool, ToolFuture};
    use semver::Version;
    use serde_json::json;
    use tempfile::TempDir;

    #[derive(Debug)]
    struct Echo;

    impl Tool for Echo {
        fn entry(&self, input: Value) -> ToolFuture {
            Box::pin(async move { Ok(input) })
        }
    }

    #[test]
    fn builder_defaults() {
        let builder = ToolsmithBuilder::default();
        assert!(builder.config.is_none());
        assert!(builder.registry_path.is_none());
        assert!(!builder.builtins);
    }

    #[tokio::test]
    async fn launch_with_builtins_lists_them() {
        let toolsmith = Toolsmith::builder()
            .in_memory()
            .with_builtins()
            .launch()
            .await
            .unwrap();

        let names: Vec<String> = toolsmith
            .list()
            .iter()
            .map(|d| d.name.clone())
            .collect();
        assert_eq!(
            names,
            vec!["sample-json-parser", "timestamp-converter", "url-encoder"]
        );
        assert_eq!(toolsmith.definitions().len(), 3);
    }

    #[tokio::test]
    async fn launch_rejects_invalid_config() {
        let mut config = ToolsmithConfig::default();
        config.invocation.default_timeout_ms = Some(0);
        let err = Toolsmith::builder()
            .in_memory()
            .config(config)
            .launch()
            .await
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn launch_fails_on_corrupt_registry() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.toml");
        std::fs::write(&path, "[[tool]]\nname = ").unwrap();

        let err = Toolsmith::builder()
            .registry_path(&path)
            .launch()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to launch"));
    }

    #[tokio::test]
    async fn lookup_unknown_is_not_found() {
        let toolsmith = Toolsmith::builder().in_memory().launch().await.unwrap();
        let err = toolsmith.lookup("nope").unwrap_err();
        assert!(err.as_tool_error().unwrap().is_not_found());
    }

    #[tokio::test]
    async fn author_then_invoke_then_retire() {
        let dir = TempDir::new().unwrap();
        let toolsmith = Toolsmith::builder()
            .registry_path(dir.path().join("registry.toml"))
            .markdown_path(dir.path().join("REGISTRY.md"))
            .tools_dir(dir.path().join("dynamic"))
            .launch()
            .await
            .unwrap();

        let draft = ToolDraft::native("echo", Version::new(1, 0, 0), Arc::new(Echo))
            .with_description("Returns its input")
            .with_test(SelfTestCase::expecting(json!({"a": 1}), json!({"a": 1})));
        let report = toolsmith.author(draft).await;
        assert!(report.is_available(), "{report:?}");

        let result = toolsmith.invoke("echo", json!({"b": 2})).await;
        assert!(result.success);
        assert_eq!(result.result, Some(json!({"b": 2})));
        assert!(toolsmith.render_registry().contains("echo"));
        assert!(std::fs::read_to_string(dir.path().join("REGISTRY.md"))
            .unwrap()
            .contains("echo"));

        let retired = toolsmith.retire("echo").await.unwrap();
        assert_eq!(retired.name, "echo");
        assert!(toolsmith.invoke("echo", json!({})).await.is_not_found());
    }
}
