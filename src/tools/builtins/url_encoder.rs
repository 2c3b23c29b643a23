//! URL percent-encoding built-in tool.

use crate::tools::definition::{Tool, ToolDescriptor, ToolFuture};
use crate::tools::error::ToolError;
use crate::tools::modules::EntryLocation;
use crate::tools::schema::{FieldType, InputSchema};
use semver::Version;
use serde::Deserialize;
use serde_json::{json, Value};
use percent_encoding::percent_decode_str;
use url::form_urlencoded;

/// Direction of conversion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Mode {
    #[default]
    Encode,
    Decode,
}

/// Arguments for the URL encoder tool.
#[derive(Debug, Deserialize)]
struct UrlEncoderArgs {
    text: String,
    #[serde(default)]
    mode: Mode,
}

/// URL encoder tool executor.
///
/// Encodes like a URI component: unreserved characters pass through and
/// everything else, including spaces, becomes `%XX`.
#[derive(Debug, Default, Clone)]
pub struct UrlEncoderTool;

impl UrlEncoderTool {
    /// Registry name of this tool.
    pub const NAME: &'static str = "url-encoder";

    /// Creates a new URL encoder tool.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the descriptor for registration.
    #[must_use]
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            Self::NAME,
            Version::new(1, 0, 0),
            EntryLocation::builtin(Self::NAME).to_string(),
        )
        .with_description("Percent-encode text for use in a URL, or decode percent-encoded text.")
        .with_schema(
            InputSchema::new()
                .required("text", FieldType::String, "The text to convert")
                .optional("mode", FieldType::String, "'encode' (default) or 'decode'"),
        )
    }

    /// Percent-encodes `text` (space becomes `%20`, not `+`).
    #[must_use]
    pub fn encode(text: &str) -> String {
        form_urlencoded::byte_serialize(text.as_bytes())
            .collect::<String>()
            .replace('+', "%20")
    }

    /// Reverses [`encode`](Self::encode). `+` is left as-is.
    ///
    /// # Errors
    ///
    /// Returns `ToolFault` for truncated or non-hex escapes, or if the
    /// decoded bytes are not UTF-8.
    pub fn decode(text: &str) -> Result<String, ToolError> {
        // percent_decode_str passes bad escapes through; reject them instead.
        let bytes = text.as_bytes();
        if let Some(position) = bytes.iter().enumerate().position(|(i, &b)| {
            b == b'%'
                && !bytes
                    .get(i + 1..i + 3)
                    .is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit))
        }) {
            return Err(ToolError::fault(
                Self::NAME,
                format!("malformed percent escape at position {position}"),
            ));
        }

        percent_decode_str(text)
            .decode_utf8()
            .map(|decoded| decoded.into_owned())
            .map_err(|_| ToolError::fault(Self::NAME, "decoded bytes are not valid UTF-8"))
    }
}

impl Tool for UrlEncoderTool {
    fn entry(&self, input: Value) -> ToolFuture {
        Box::pin(async move {
            let args: UrlEncoderArgs = serde_json::from_value(input).map_err(|e| {
                ToolError::validation("mode", format!("invalid arguments: {e}"))
            })?;

            let output = match args.mode {
                Mode::Encode => Self::encode(&args.text),
                Mode::Decode => Self::decode(&args.text)?,
            };

            Ok(json!({
                "input": args.text,
                "output": output,
                "mode": match args.mode {
                    Mode::Encode => "encode",
                    Mode::Decode => "decode",
                },
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_like_a_uri_component() {
        assert_eq!(UrlEncoderTool::encode("hello world"), "hello%20world");
        assert_eq!(UrlEncoderTool::encode("a&b=c/d?"), "a%26b%3Dc%2Fd%3F");
        assert_eq!(UrlEncoderTool::encode("safe-_.*"), "safe-_.*");
        assert_eq!(UrlEncoderTool::encode("café"), "caf%C3%A9");
        assert_eq!(UrlEncoderTool::encode("1+1"), "1%2B1");
    }

    #[test]
    fn decode_reverses_encode() {
        let text = "OpenClaw builds tools: 100% & more!";
        let encoded = UrlEncoderTool::encode(text);
        assert_eq!(UrlEncoderTool::decode(&encoded).unwrap(), text);
    }

    #[test]
    fn decode_rejects_bad_escapes() {
        assert!(UrlEncoderTool::decode("%G1").is_err());
        assert!(UrlEncoderTool::decode("abc%2").is_err());
        assert!(UrlEncoderTool::decode("%FF").unwrap_err().result_message().contains("UTF-8"));
    }

    #[test]
    fn decode_reports_where_the_bad_escape_is() {
        let error = UrlEncoderTool::decode("ok%20then%zz").unwrap_err();
        assert!(error.is_fault());
        assert!(error.result_message().contains("position 9"), "{error}");
        assert_eq!(UrlEncoderTool::decode("100%25").unwrap(), "100%");
        assert_eq!(UrlEncoderTool::decode("a+b").unwrap(), "a+b");
    }

    #[tokio::test]
    async fn entry_defaults_to_encode() {
        let result = UrlEncoderTool::new()
            .entry(json!({"text": "a b"}))
            .await
            .unwrap();
        assert_eq!(result["output"], "a%20b");
        assert_eq!(result["mode"], "encode");
    }

    #[tokio::test]
    async fn entry_decodes() {
        let result = UrlEncoderTool::new()
            .entry(json!({"text": "a%20b", "mode": "decode"}))
            .await
            .unwrap();
        assert_eq!(result["output"], "a b");
    }

    #[tokio::test]
    async fn unknown_mode_is_rejected() {
        let error = UrlEncoderTool::new()
            .entry(json!({"text": "x", "mode": "rot13"}))
            .await
            .unwrap_err();
        assert!(error.is_validation());
    }
}
