//! The tool loader and invoker.
//!
//! Every invocation passes through [`ToolLoader::invoke_with`]:
//!
//! 1. resolve the name in the registry (`NotFound`, unattributed)
//! 2. validate input against the declared schema (`ValidationError`)
//! 3. materialize the module and run it on its own task
//! 4. fold errors, panics, and timeouts into an [`InvocationResult`]
//!
//! Nothing here returns `Err` to the caller: the result shape carries failure.

use crate::tools::definition::{SharedTool, ToolDescriptor};
use crate::tools::error::ToolError;
use crate::tools::modules::ModuleTable;
use crate::tools::registry::ToolRegistry;
use crate::tools::result::{InvocationRequest, InvocationResult};
use serde_json::Value;
use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{AbortHandle, JoinError};

/// Per-call invocation options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvokeOptions {
    /// Abandon the call after this long; overrides the loader's default
    pub timeout: Option<Duration>,
}

impl InvokeOptions {
    /// Options with no per-call overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Aborts the tool task if the invocation future is dropped.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn join_fault(tool_name: &str, error: JoinError) -> ToolError {
    if error.is_panic() {
        let payload = error.into_panic();
        ToolError::fault(
            tool_name,
            format!("tool panicked: {}", panic_message(payload.as_ref())),
        )
    } else {
        ToolError::fault(tool_name, "tool execution was cancelled")
    }
}

/// Runs a resolved module against `input` and normalizes the outcome.
///
/// The input is validated against `descriptor.input_schema` first; the module
/// only runs on valid input. The module executes on its own task, so a panic
/// becomes a `ToolFault`. When `timeout` elapses the task is aborted and its
/// eventual result discarded.
pub async fn run_module(
    descriptor: &ToolDescriptor,
    module: SharedTool,
    input: Value,
    timeout: Option<Duration>,
) -> InvocationResult {
    if let Err(e) = descriptor.input_schema.validate(&input) {
        tracing::debug!(tool_name = %descriptor.name, error = %e, "Input rejected");
        return InvocationResult::failure(descriptor, &e);
    }

    let started = Instant::now();
    let task = tokio::spawn(async move { module.entry(input).await });
    let _abort = AbortOnDrop(task.abort_handle());

    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined.map_err(|e| join_fault(&descriptor.name, e)),
            Err(_) => Err(ToolError::timeout(&descriptor.name, limit)),
        },
        None => task.await.map_err(|e| join_fault(&descriptor.name, e)),
    }
    .and_then(|result| result);

    let duration_ms = started.elapsed().as_millis() as u64;
    match outcome {
        Ok(value) => {
            tracing::debug!(
                tool_name = %descriptor.name,
                version = %descriptor.version,
                duration_ms,
                "Tool invocation succeeded"
            );
            InvocationResult::success(descriptor, value)
        }
        Err(e) => {
            tracing::warn!(
                tool_name = %descriptor.name,
                version = %descriptor.version,
                duration_ms,
                error = %e,
                "Tool invocation failed"
            );
            InvocationResult::failure(descriptor, &e)
        }
    }
}

/// Resolves tool names and executes them.
#[derive(Debug, Clone)]
pub struct ToolLoader {
    registry: Arc<ToolRegistry>,
    modules: Arc<ModuleTable>,
    default_timeout: Option<Duration>,
}

impl ToolLoader {
    /// Creates a loader over `registry` and `modules`, with no default timeout.
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, modules: Arc<ModuleTable>) -> Self {
        Self {
            registry,
            modules,
            default_timeout: None,
        }
    }

    /// Applies `timeout` to calls that do not set their own.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// The timeout applied when a call sets none.
    #[must_use]
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    /// The registry this loader resolves against.
    #[must_use]
    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// The module table this loader materializes from.
    #[must_use]
    pub fn modules(&self) -> &Arc<ModuleTable> {
        &self.modules
    }

    /// Invokes `tool_name` with `input` using default options.
    pub async fn invoke(&self, tool_name: &str, input: Value) -> InvocationResult {
        self.invoke_with(tool_name, input, InvokeOptions::default())
            .await
    }

    /// Invokes a request using default options.
    pub async fn invoke_request(&self, request: InvocationRequest) -> InvocationResult {
        self.invoke(&request.tool_name, request.input).await
    }

    /// Invokes `tool_name` with `input`.
    pub async fn invoke_with(
        &self,
        tool_name: &str,
        input: Value,
        options: InvokeOptions,
    ) -> InvocationResult {
        let descriptor = match self.registry.lookup(tool_name) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                let suggestions = self.registry.suggest(tool_name);
                tracing::info!(
                    tool_name = %tool_name,
                    suggestions = ?suggestions,
                    "Tool not found"
                );
                return InvocationResult::unresolved(&e);
            }
        };

        let module = match self.modules.materialize(&descriptor) {
            Ok(module) => module,
            Err(e) => {
                tracing::warn!(tool_name = %tool_name, error = %e, "Tool module unavailable");
                // Schema errors take precedence over an unavailable module.
                return match descriptor.input_schema.validate(&input) {
                    Err(invalid) => InvocationResult::failure(&descriptor, &invalid),
                    Ok(()) => InvocationResult::failure(&descriptor, &e),
                };
            }
        };

        run_module(
            &descriptor,
            module,
            input,
            options.timeout.or(self.default_timeout),
        )
        .await
    }
}
