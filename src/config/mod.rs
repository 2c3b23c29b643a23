//! Configuration management for toolsmith.
//!
//! Configuration is TOML. The search order is:
//! 1. `./toolsmith.toml` (project-local)
//! 2. `~/.config/toolsmith/config.toml` (XDG config)
//!
//! # Usage
//!
//! ```rust,ignore
//! use toolsmith::config;
//!
//! let config = config::load()?;
//! let config = config::from_path(Path::new("/etc/toolsmith/config.toml"))?;
//! ```
//!
//! [`ToolManifest`] is the separate file format `toolsmith author` reads to
//! describe a script tool.

mod file;
mod manifest;
mod types;

pub use file::{from_path, from_str, load, search_paths, xdg_config_dir};
pub use manifest::{ManifestTest, ToolManifest};
pub use types::{AuthoringConfig, InvocationConfig, RegistryConfig, ToolsmithConfig};
