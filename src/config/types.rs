//! Configuration types.

use crate::error::ToolsmithError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for toolsmith.
///
/// Every section is optional:
///
/// ```toml
/// [registry]
/// path = "tools/registry.toml"
/// markdown = "tools/REGISTRY.md"
///
/// [invocation]
/// default_timeout_ms = 30000
///
/// [authoring]
/// tools_dir = "tools/dynamic"
/// self_test_timeout_ms = 10000
///
/// [logging]
/// level = "Info"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsmithConfig {
    /// Where the registry is persisted.
    pub registry: RegistryConfig,
    /// Invocation defaults.
    pub invocation: InvocationConfig,
    /// Author workflow settings.
    pub authoring: AuthoringConfig,
    /// File logging.
    pub logging: LoggingConfig,
}

impl ToolsmithConfig {
    /// Creates a configuration with every default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks values serde cannot.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the offending field.
    pub fn validate(&self) -> Result<(), ToolsmithError> {
        if self.registry.path.as_os_str().is_empty() {
            return Err(ToolsmithError::configuration(
                "registry.path",
                "cannot be empty",
            ));
        }
        if self.authoring.tools_dir.as_os_str().is_empty() {
            return Err(ToolsmithError::configuration(
                "authoring.tools_dir",
                "cannot be empty",
            ));
        }
        if self.invocation.default_timeout_ms == Some(0) {
            return Err(ToolsmithError::configuration(
                "invocation.default_timeout_ms",
                "must be greater than zero; omit it to disable the timeout",
            ));
        }
        if self.authoring.self_test_timeout_ms == Some(0) {
            return Err(ToolsmithError::configuration(
                "authoring.self_test_timeout_ms",
                "must be greater than zero; omit it to disable the timeout",
            ));
        }
        Ok(())
    }
}

/// `[registry]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// The registry file (source of truth).
    pub path: PathBuf,
    /// Optional Markdown view, rewritten after each change.
    pub markdown: Option<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("tools/registry.toml"),
            markdown: Some(PathBuf::from("tools/REGISTRY.md")),
        }
    }
}

/// `[invocation]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvocationConfig {
    /// Timeout applied when a call sets none; absent means no limit.
    pub default_timeout_ms: Option<u64>,
}

impl InvocationConfig {
    /// The default timeout as a `Duration`.
    #[must_use]
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_ms.map(Duration::from_millis)
    }
}

/// `[authoring]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthoringConfig {
    /// Where drafted scripts are written.
    pub tools_dir: PathBuf,
    /// Limit for each self-test case.
    pub self_test_timeout_ms: Option<u64>,
}

impl AuthoringConfig {
    /// The self-test limit as a `Duration`.
    #[must_use]
    pub fn self_test_timeout(&self) -> Option<Duration> {
        self.self_test_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for AuthoringConfig {
    fn default() -> Self {
        Self {
            tools_dir: PathBuf::from("tools/dynamic"),
            self_test_timeout_ms: Some(10_000),
        }
    }
}
