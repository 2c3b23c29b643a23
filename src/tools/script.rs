//! Script-backed Tool Modules.
//!
//! A script tool runs as `<interpreter> <path>`, receives the input object as
//! JSON on stdin and answers with an InvocationResult-shaped JSON object on
//! stdout. Diagnostics may go to stderr; they are quoted in fault messages.

use crate::tools::definition::{Tool, ToolFuture};
use crate::tools::error::ToolError;
use crate::tools::result::normalize_raw;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Maximum stderr characters quoted in a fault message.
const MAX_STDERR_QUOTE: usize = 512;

/// Tool Module backed by an interpreter and a script file.
#[derive(Debug, Clone)]
pub struct ScriptTool {
    tool_name: String,
    interpreter: String,
    path: PathBuf,
}

impl ScriptTool {
    /// Creates a script tool.
    #[must_use]
    pub fn new(tool_name: impl Into<String>, interpreter: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            tool_name: tool_name.into(),
            interpreter: interpreter.into(),
            path: path.into(),
        }
    }

    /// The interpreter program.
    #[must_use]
    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    /// The script file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Extracts the JSON reply from stdout.
    ///
    /// The whole output is tried first, then the last non-empty line, so
    /// scripts may print progress before their answer.
    fn parse_stdout(&self, stdout: &str) -> Result<Value, ToolError> {
        let trimmed = stdout.trim();
        if trimmed.is_empty() {
            return Err(ToolError::fault(&self.tool_name, "script produced no output"));
        }
        if let Ok(value) = serde_json::from_str(trimmed) {
            return Ok(value);
        }
        trimmed
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .and_then(|line| serde_json::from_str(line.trim()).ok())
            .ok_or_else(|| {
                ToolError::fault(&self.tool_name, "script output is not valid JSON")
            })
    }
}

fn quote_stderr(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.chars().count() > MAX_STDERR_QUOTE {
        let cut: String = text.chars().take(MAX_STDERR_QUOTE).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

impl Tool for ScriptTool {
    fn entry(&self, input: Value) -> ToolFuture {
        let this = self.clone();

        Box::pin(async move {
            let payload = serde_json::to_vec(&input).map_err(|e| {
                ToolError::fault(&this.tool_name, format!("failed to encode input: {e}"))
            })?;

            let mut child = Command::new(&this.interpreter)
                .arg(&this.path)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| {
                    ToolError::fault(
                        &this.tool_name,
                        format!("failed to spawn '{}': {e}", this.interpreter),
                    )
                })?;

            let stdin = child.stdin.take();
            let feed = async move {
                let Some(mut stdin) = stdin else {
                    return Ok(());
                };
                match stdin.write_all(&payload).await {
                    Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(e),
                    _ => Ok(()),
                }
            };

            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            let output = output.map_err(|e| {
                ToolError::fault(&this.tool_name, format!("process error: {e}"))
            })?;
            fed.map_err(|e| {
                ToolError::fault(&this.tool_name, format!("failed to write input: {e}"))
            })?;

            if !output.status.success() {
                let code = output
                    .status
                    .code()
                    .map_or_else(|| "signal".to_string(), |c| c.to_string());
                let stderr = quote_stderr(&output.stderr);
                tracing::warn!(
                    tool_name = %this.tool_name,
                    exit_code = %code,
                    "Script tool exited unsuccessfully"
                );
                return Err(ToolError::fault(
                    &this.tool_name,
                    if stderr.is_empty() {
                        format!("script exited with status {code}")
                    } else {
                        format!("script exited with status {code}: {stderr}")
                    },
                ));
            }

            let raw = this.parse_stdout(&String::from_utf8_lossy(&output.stdout))?;
            normalize_raw(&this.tool_name, raw)
        })
    }
}
