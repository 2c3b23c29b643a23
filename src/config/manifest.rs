//! Script tool manifests read by `toolsmith author`.
//!
//! ```toml
//! name = "word-count"
//! version = "1.0.0"
//! description = "Counts words in text"
//! interpreter = "python3"
//! script = "word_count.py"
//!
//! [input.text]
//! type = "string"
//! required = true
//!
//! [[test]]
//! input = { text = "a b c" }
//! expect = { count = 3 }
//! ```
//!
//! `script` is resolved against the manifest's directory.

use crate::error::ToolsmithError;
use crate::tools::{FieldSpec, InputSchema, SelfTestCase, ToolDraft};
use semver::Version;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A script tool described in TOML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolManifest {
    /// Tool name
    pub name: String,
    /// Version to register
    pub version: Version,
    /// Summary shown to the agent
    #[serde(default)]
    pub description: String,
    /// Program that runs the script, e.g. `python3`
    pub interpreter: String,
    /// Path to the script body
    pub script: PathBuf,
    /// Reject undeclared input fields
    #[serde(default)]
    pub strict: bool,
    /// Declared input fields
    #[serde(default)]
    pub input: BTreeMap<String, FieldSpec>,
    /// The version this manifest replaces, for a version bump
    #[serde(default)]
    pub replaces: Option<Version>,
    /// Self-test cases
    #[serde(default, rename = "test")]
    pub tests: Vec<ManifestTest>,
}

/// One `[[test]]` case.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ManifestTest {
    /// Input passed to the tool
    #[serde(default = "empty_object")]
    pub input: Value,
    /// Expected result; any success passes when absent
    #[serde(default)]
    pub expect: Option<Value>,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

impl ToolManifest {
    /// Parses a manifest from TOML text.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for invalid TOML or missing fields.
    pub fn parse(toml_str: &str) -> Result<Self, ToolsmithError> {
        toml::from_str(toml_str)
            .map_err(|e| ToolsmithError::configuration("manifest", format!("invalid TOML: {e}")))
    }

    /// Reads a manifest and turns it into a draft, loading the script body.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the manifest or script cannot be read, and a
    /// configuration error if the manifest is invalid.
    pub fn load_draft(path: &Path) -> Result<ToolDraft, ToolsmithError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ToolsmithError::io(path.display().to_string(), e.to_string()))?;
        let manifest = Self::parse(&text)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        manifest.into_draft(base)
    }

    /// Builds a draft, reading `script` relative to `base`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the script cannot be read.
    pub fn into_draft(self, base: &Path) -> Result<ToolDraft, ToolsmithError> {
        let script_path = base.join(&self.script);
        let body = std::fs::read_to_string(&script_path)
            .map_err(|e| ToolsmithError::io(script_path.display().to_string(), e.to_string()))?;
        let extension = self
            .script
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("script")
            .to_string();

        let schema = InputSchema {
            strict: self.strict,
            fields: self.input,
        };

        let mut draft = ToolDraft::script(
            self.name,
            self.version,
            self.interpreter,
            extension,
            body,
        )
        .with_description(self.description)
        .with_schema(schema);

        for case in self.tests {
            draft = draft.with_test(match case.expect {
                Some(expect) => SelfTestCase::expecting(case.input, expect),
                None => SelfTestCase::new(case.input),
            });
        }
        if let Some(previous) = self.replaces {
            draft = draft.replacing(previous);
        }
        Ok(draft)
    }
}
