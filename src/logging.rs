//! Logging setup.
//!
//! File logging rolls daily into an XDG data directory by default
//! (`~/.local/share/toolsmith/logs/toolsmith.log.YYYY-MM-DD`). The CLI can add
//! a stderr layer filtered by `RUST_LOG` for interactive debugging.

use crate::error::ToolsmithError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// Configuration for file logging.
///
/// ```toml
/// [logging]
/// enabled = true
/// app_name = "toolsmith"
/// level = "Debug"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether file logging is enabled.
    pub enabled: bool,
    /// Log files are named `{app_name}.log` with a date suffix.
    pub app_name: String,
    /// Custom log directory; defaults to the XDG data dir + `toolsmith/logs`.
    pub log_dir: Option<PathBuf>,
    /// Level filter for the file.
    pub level: LogLevel,
}

impl LoggingConfig {
    /// Creates a LoggingConfig with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a disabled configuration.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Sets the application name for log file naming.
    #[must_use]
    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Sets a custom log directory.
    #[must_use]
    pub fn with_log_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(path.into());
        self
    }

    /// Sets the level filter.
    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Resolves the directory log files are written to.
    ///
    /// # Errors
    ///
    /// Returns a logging error if no custom directory is set and the XDG
    /// data directory cannot be determined.
    pub fn resolve_log_dir(&self) -> Result<PathBuf, ToolsmithError> {
        if let Some(ref dir) = self.log_dir {
            return Ok(dir.clone());
        }
        dirs::data_local_dir()
            .map(|dir| dir.join("toolsmith").join("logs"))
            .ok_or_else(|| {
                ToolsmithError::logging(
                    "could not determine XDG data directory; set XDG_DATA_HOME or logging.log_dir",
                )
            })
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            app_name: "toolsmith".to_string(),
            log_dir: None,
            level: LogLevel::default(),
        }
    }
}

/// Log level filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogLevel {
    /// Most verbose.
    Trace,
    /// Debug level.
    Debug,
    /// Default.
    #[default]
    Info,
    /// Warn level.
    Warn,
    /// Least verbose.
    Error,
}

impl LogLevel {
    /// Converts to a tracing_subscriber LevelFilter.
    #[must_use]
    pub fn to_filter(self) -> LevelFilter {
        match self {
            Self::Trace => LevelFilter::TRACE,
            Self::Debug => LevelFilter::DEBUG,
            Self::Info => LevelFilter::INFO,
            Self::Warn => LevelFilter::WARN,
            Self::Error => LevelFilter::ERROR,
        }
    }
}

/// Keeps the non-blocking file writer alive; pending lines flush on drop.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

impl fmt::Debug for LoggingGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggingGuard").finish_non_exhaustive()
    }
}

static LOGGING_GUARD: OnceLock<LoggingGuard> = OnceLock::new();

/// Installs the global subscriber.
///
/// File output follows `config`; with `stderr` set, events matching
/// `RUST_LOG` (default `toolsmith=debug`) are also written to stderr.
/// Returns the file guard when a file layer was installed.
///
/// # Errors
///
/// Returns a logging error if the log directory cannot be created or a
/// global subscriber is already set.
pub fn init_logging(
    config: &LoggingConfig,
    stderr: bool,
) -> Result<Option<LoggingGuard>, ToolsmithError> {
    let (file_layer, guard) = if config.enabled {
        let log_dir = config.resolve_log_dir()?;
        std::fs::create_dir_all(&log_dir).map_err(|e| {
            ToolsmithError::logging(format!(
                "failed to create log directory '{}': {e}; check permissions",
                log_dir.display()
            ))
        })?;

        let appender =
            tracing_appender::rolling::daily(&log_dir, format!("{}.log", config.app_name));
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false)
            .with_filter(config.level.to_filter());
        (Some(layer), Some(LoggingGuard { _guard: guard }))
    } else {
        (None, None)
    };

    let stderr_layer = stderr.then(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("toolsmith=debug"));
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter)
    });

    if file_layer.is_none() && stderr_layer.is_none() {
        return Ok(None);
    }

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| {
            ToolsmithError::logging(format!(
                "failed to initialize tracing subscriber: {e}; a subscriber may already be set"
            ))
        })?;

    Ok(guard)
}

/// Installs logging once per process and keeps the guard for its lifetime.
///
/// Returns `Ok(false)` if logging was already installed or nothing is enabled.
///
/// # Errors
///
/// See [`init_logging`].
pub fn init_and_store_logging(config: &LoggingConfig, stderr: bool) -> Result<bool, ToolsmithError> {
    if LOGGING_GUARD.get().is_some() {
        return Ok(false);
    }
    match init_logging(config, stderr)? {
        Some(guard) => {
            let _ = LOGGING_GUARD.set(guard);
            Ok(true)
        }
        None => Ok(stderr),
    }
}
