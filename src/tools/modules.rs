//! Entry locations and the module table.
//!
//! A descriptor's `entry_location` names where its implementation lives. The
//! [`ModuleTable`] turns a location into a runnable [`SharedTool`]: compiled-in
//! and authored in-process modules are looked up by location key, and script
//! locations are materialized on demand.

use crate::tools::definition::{SharedTool, ToolDescriptor};
use crate::tools::error::ToolError;
use crate::tools::script::ScriptTool;
use semver::Version;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// A parsed entry location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryLocation {
    /// `builtin:<name>`, a compiled-in module
    Builtin {
        /// Module name
        name: String,
    },
    /// `native:<name>@<version>`, an in-process module mounted at authoring time
    Native {
        /// Module name
        name: String,
        /// Module version
        version: Version,
    },
    /// `script:<interpreter>:<path>`, run as `<interpreter> <path>`
    Script {
        /// Interpreter program, e.g. `python3`
        interpreter: String,
        /// Script file path
        path: PathBuf,
    },
}

impl EntryLocation {
    /// Parses a location string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDescriptor` for unknown schemes or empty components.
    pub fn parse(location: &str) -> Result<Self, ToolError> {
        let invalid = |reason: &str| {
            ToolError::invalid_descriptor("entry_location", format!("'{location}' {reason}"))
        };

        let Some((scheme, rest)) = location.split_once(':') else {
            return Err(invalid(
                "must be 'builtin:<name>', 'native:<name>@<version>' or 'script:<interpreter>:<path>'",
            ));
        };

        match scheme {
            "builtin" => {
                if rest.is_empty() {
                    return Err(invalid("has an empty module name"));
                }
                Ok(Self::Builtin {
                    name: rest.to_string(),
                })
            }
            "native" => {
                let Some((name, version)) = rest.rsplit_once('@') else {
                    return Err(invalid("is missing '@<version>'"));
                };
                if name.is_empty() {
                    return Err(invalid("has an empty module name"));
                }
                let version = Version::parse(version)
                    .map_err(|e| invalid(&format!("has a bad version: {e}")))?;
                Ok(Self::Native {
                    name: name.to_string(),
                    version,
                })
            }
            "script" => {
                let Some((interpreter, path)) = rest.split_once(':') else {
                    return Err(invalid("is missing ':<path>'"));
                };
                if interpreter.is_empty() || path.is_empty() {
                    return Err(invalid("needs both an interpreter and a path"));
                }
                Ok(Self::Script {
                    interpreter: interpreter.to_string(),
                    path: PathBuf::from(path),
                })
            }
            other => Err(invalid(&format!("uses unknown scheme '{other}'"))),
        }
    }

    /// Location for a compiled-in module.
    #[must_use]
    pub fn builtin(name: impl Into<String>) -> Self {
        Self::Builtin { name: name.into() }
    }

    /// Location for an in-process authored module.
    #[must_use]
    pub fn native(name: impl Into<String>, version: Version) -> Self {
        Self::Native {
            name: name.into(),
            version,
        }
    }

    /// Location for a script module.
    #[must_use]
    pub fn script(interpreter: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::Script {
            interpreter: interpreter.into(),
            path: path.into(),
        }
    }

    /// Returns true if the module must be mounted in the table to run.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        !matches!(self, Self::Script { .. })
    }
}

impl fmt::Display for EntryLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin { name } => write!(f, "builtin:{name}"),
            Self::Native { name, version } => write!(f, "native:{name}@{version}"),
            Self::Script { interpreter, path } => {
                write!(f, "script:{interpreter}:{}", path.display())
            }
        }
    }
}

/// Lookup table from entry location to Tool Module.
#[derive(Debug, Default)]
pub struct ModuleTable {
    modules: RwLock<HashMap<String, SharedTool>>,
}

impl ModuleTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mounts `tool` at `location`, replacing any previous module there.
    pub fn mount(&self, location: &EntryLocation, tool: SharedTool) {
        let key = location.to_string();
        tracing::debug!(location = %key, "Module mounted");
        self.write().insert(key, tool);
    }

    /// Removes the module at `location`, returning it if present.
    pub fn unmount(&self, location: &EntryLocation) -> Option<SharedTool> {
        let key = location.to_string();
        let removed = self.write().remove(&key);
        if removed.is_some() {
            tracing::debug!(location = %key, "Module unmounted");
        }
        removed
    }

    /// Returns true if a module is mounted at `location`.
    #[must_use]
    pub fn is_mounted(&self, location: &EntryLocation) -> bool {
        self.read().contains_key(&location.to_string())
    }

    /// Number of mounted modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true if nothing is mounted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Produces the runnable module for `location`.
    ///
    /// # Errors
    ///
    /// Returns `ToolFault` if a builtin or native module is not mounted.
    pub fn resolve(&self, tool_name: &str, location: &EntryLocation) -> Result<SharedTool, ToolError> {
        match location {
            EntryLocation::Script { interpreter, path } => Ok(Arc::new(ScriptTool::new(
                tool_name,
                interpreter.clone(),
                path.clone(),
            ))),
            mounted => self
                .read()
                .get(&mounted.to_string())
                .cloned()
                .ok_or_else(|| {
                    ToolError::fault(
                        tool_name,
                        format!("module unavailable at '{mounted}'; re-author the tool to restore it"),
                    )
                }),
        }
    }

    /// Produces the runnable module for a descriptor.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDescriptor` for a malformed location, or `ToolFault`
    /// if the module is not mounted.
    pub fn materialize(&self, descriptor: &ToolDescriptor) -> Result<SharedTool, ToolError> {
        let location = descriptor.location()?;
        self.resolve(&descriptor.name, &location)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, SharedTool>> {
        self.modules
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, SharedTool>> {
        self.modules
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
