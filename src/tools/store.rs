//! Durable registry storage.
//!
//! The structured source of truth is a TOML file of `[[tool]]` tables. Every
//! save writes a temporary file in the same directory and renames it over the
//! old one, so a reader only ever sees a complete previous or next version.
//! The Markdown listing is a derived view written the same way.

use crate::tools::definition::ToolDescriptor;
use crate::tools::error::ToolError;
use crate::tools::registry::RegistryEntry;
use crate::tools::schema::InputSchema;
use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// On-disk shape of the registry file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default, rename = "tool")]
    tools: Vec<StoredTool>,
}

/// One `[[tool]]` table. Scalar fields precede the schema table.
#[derive(Debug, Serialize, Deserialize)]
struct StoredTool {
    name: String,
    version: Version,
    #[serde(default)]
    description: String,
    entry_location: String,
    registered_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    input_schema: InputSchema,
}

impl From<&RegistryEntry> for StoredTool {
    fn from(entry: &RegistryEntry) -> Self {
        let d = &entry.descriptor;
        Self {
            name: d.name.clone(),
            version: d.version.clone(),
            description: d.description.clone(),
            entry_location: d.entry_location.clone(),
            registered_at: entry.registered_at,
            updated_at: entry.updated_at,
            input_schema: d.input_schema.clone(),
        }
    }
}

impl From<StoredTool> for RegistryEntry {
    fn from(stored: StoredTool) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: stored.name,
                version: stored.version,
                description: stored.description,
                entry_location: stored.entry_location,
                input_schema: stored.input_schema,
            },
            registered_at: stored.registered_at,
            updated_at: stored.updated_at,
        }
    }
}

/// File-backed persistence for the registry.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
    markdown_path: Option<PathBuf>,
}

impl RegistryStore {
    /// Creates a store for the TOML file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            markdown_path: None,
        }
    }

    /// Also maintains a Markdown listing at `path`.
    #[must_use]
    pub fn with_markdown(mut self, path: impl Into<PathBuf>) -> Self {
        self.markdown_path = Some(path.into());
        self
    }

    /// Path of the TOML source of truth.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the Markdown view, if configured.
    #[must_use]
    pub fn markdown_path(&self) -> Option<&Path> {
        self.markdown_path.as_deref()
    }

    /// Loads all entries in registration order. A missing file is an empty registry.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the file cannot be read, does not parse, holds
    /// an invalid descriptor, or repeats a name.
    pub async fn load(&self) -> Result<Vec<RegistryEntry>, ToolError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No registry file yet");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(ToolError::storage(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )))
            }
        };

        let entries = parse_registry(&content)
            .map_err(|e| ToolError::storage(format!("{}: {e}", self.path.display())))?;

        tracing::debug!(
            path = %self.path.display(),
            tools = entries.len(),
            "Registry file loaded"
        );
        Ok(entries)
    }

    /// Atomically replaces the registry file (and Markdown view) with `entries`.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if serialization or any filesystem step fails.
    pub async fn save(&self, entries: &[RegistryEntry]) -> Result<(), ToolError> {
        let content = serialize_registry(entries)?;
        write_atomic(&self.path, content).await?;

        if let Some(ref markdown_path) = self.markdown_path {
            write_atomic(markdown_path, render_markdown(entries)).await?;
        }

        tracing::debug!(
            path = %self.path.display(),
            tools = entries.len(),
            "Registry file saved"
        );
        Ok(())
    }
}

/// Parses registry TOML into entries.
fn parse_registry(content: &str) -> Result<Vec<RegistryEntry>, ToolError> {
    let file: RegistryFile =
        toml::from_str(content).map_err(|e| ToolError::storage(format!("invalid TOML: {e}")))?;

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(file.tools.len());
    for stored in file.tools {
        let entry = RegistryEntry::from(stored);
        entry.descriptor.validate().map_err(|e| {
            ToolError::storage(format!("invalid entry '{}': {e}", entry.descriptor.name))
        })?;
        if !seen.insert(entry.descriptor.name.clone()) {
            return Err(ToolError::storage(format!(
                "duplicate entry '{}'",
                entry.descriptor.name
            )));
        }
        entries.push(entry);
    }
    Ok(entries)
}

/// Serializes entries to registry TOML.
fn serialize_registry(entries: &[RegistryEntry]) -> Result<String, ToolError> {
    let file = RegistryFile {
        tools: entries.iter().map(StoredTool::from).collect(),
    };
    let body = toml::to_string_pretty(&file)
        .map_err(|e| ToolError::storage(format!("failed to serialize registry: {e}")))?;
    Ok(format!(
        "# Tool registry. Managed by toolsmith; edit with care.\n\n{body}"
    ))
}

/// Writes `content` to a temp file beside `path`, syncs it, and renames it into place.
async fn write_atomic(path: &Path, content: String) -> Result<(), ToolError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut file = tempfile::Builder::new()
            .prefix(".toolsmith.")
            .suffix(".tmp")
            .tempfile_in(&dir)?;
        file.write_all(content.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&path).map_err(|e| e.error)?;
        Ok::<(), std::io::Error>(())
    })
    .await
    .map_err(|e| ToolError::storage(format!("write task failed: {e}")))?
    .map_err(|e| ToolError::storage(format!("failed to write registry file: {e}")))
}

/// Escapes a value for a Markdown table cell.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Renders the human-readable listing of `entries`.
#[must_use]
pub fn render_markdown(entries: &[RegistryEntry]) -> String {
    let mut out = String::from("# Tool Registry\n\n");

    if entries.is_empty() {
        out.push_str("_No tools registered._\n");
        return out;
    }

    out.push_str("| Name | Version | Description | Location |\n");
    out.push_str("|------|---------|-------------|----------|\n");
    for entry in entries {
        let d = &entry.descriptor;
        let _ = writeln!(
            out,
            "| {} | {} | {} | `{}` |",
            cell(&d.name),
            d.version,
            cell(&d.description),
            d.entry_location
        );
    }

    for entry in entries {
        let d = &entry.descriptor;
        let _ = write!(out, "\n## {}\n\n", d.name);
        if !d.description.is_empty() {
            let _ = writeln!(out, "{}\n", d.description);
        }
        let _ = writeln!(
            out,
            "- Version: {}\n- Registered: {}\n- Updated: {}",
            d.version,
            entry.registered_at.to_rfc3339(),
            entry.updated_at.to_rfc3339()
        );

        if d.input_schema.fields.is_empty() {
            out.push_str("- Inputs: none\n");
        } else {
            out.push_str("- Inputs:\n");
            for (name, spec) in &d.input_schema.fields {
                let requirement = if spec.required { "required" } else { "optional" };
                let _ = write!(out, "  - `{}` ({}, {})", name, spec.field_type, requirement);
                match spec.description {
                    Some(ref description) if !description.is_empty() => {
                        let _ = writeln!(out, ": {description}");
                    }
                    _ => out.push('\n'),
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema::FieldType;
    use tempfile::TempDir;

    fn entry(name: &str) -> RegistryEntry {
        let now = Utc::now();
        RegistryEntry {
            descriptor: ToolDescriptor::new(name, Version::new(1, 0, 0), format!("builtin:{name}"))
                .with_description("Does a | thing")
                .with_schema(
                    InputSchema::new()
                        .required("text", FieldType::String, "Input text")
                        .optional("mode", FieldType::String, ""),
                ),
            registered_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = RegistryStore::new(dir.path().join("registry.toml"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load_preserves_order_and_content() {
        let dir = TempDir::new().unwrap();
        let store = RegistryStore::new(dir.path().join("nested/registry.toml"));
        let entries = vec![entry("zeta-tool"), entry("alpha-tool")];

        store.save(&entries).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded, entries);
    }

    #[tokio::test]
    async fn save_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let store = RegistryStore::new(dir.path().join("registry.toml"));
        store.save(&[entry("a-tool")]).await.unwrap();
        store.save(&[entry("a-tool"), entry("b-tool")]).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["registry.toml".to_string()]);
    }

    #[tokio::test]
    async fn file_is_human_readable() {
        let dir = TempDir::new().unwrap();
        let store = RegistryStore::new(dir.path().join("registry.toml"));
        store.save(&[entry("url-encoder")]).await.unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("[[tool]]"));
        assert!(text.contains("name = \"url-encoder\""));
        assert!(text.contains("version = \"1.0.0\""));
        assert!(text.contains("entry_location = \"builtin:url-encoder\""));
    }

    #[tokio::test]
    async fn markdown_view_written_alongside() {
        let dir = TempDir::new().unwrap();
        let store = RegistryStore::new(dir.path().join("registry.toml"))
            .with_markdown(dir.path().join("REGISTRY.md"));
        store.save(&[entry("url-encoder")]).await.unwrap();

        let markdown = std::fs::read_to_string(dir.path().join("REGISTRY.md")).unwrap();
        assert!(markdown.contains("| url-encoder | 1.0.0 | Does a \\| thing |"));
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected_on_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.toml");
        let content = serialize_registry(&[entry("a-tool"), entry("a-tool")]).unwrap();
        std::fs::write(&path, content).unwrap();

        let error = RegistryStore::new(&path).load().await.unwrap_err();
        assert!(error.to_string().contains("duplicate entry 'a-tool'"));
    }

    #[tokio::test]
    async fn invalid_toml_is_a_storage_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("registry.toml");
        std::fs::write(&path, "[[tool]\nname = ").unwrap();

        let error = RegistryStore::new(&path).load().await.unwrap_err();
        assert_eq!(error.code(), "Storage");
    }

    #[test]
    fn markdown_lists_inputs() {
        let markdown = render_markdown(&[entry("url-encoder")]);
        assert!(markdown.starts_with("# Tool Registry"));
        assert!(markdown.contains("## url-encoder"));
        assert!(markdown.contains("`text` (string, required): Input text"));
        assert!(markdown.contains("`mode` (string, optional)\n"));
    }

    #[test]
    fn markdown_for_empty_registry() {
        assert!(render_markdown(&[]).contains("No tools registered"));
    }
}
