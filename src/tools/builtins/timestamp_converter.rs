//! Unix timestamp conversion built-in tool.

use crate::tools::definition::{Tool, ToolDescriptor, ToolFuture};
use crate::tools::error::ToolError;
use crate::tools::modules::EntryLocation;
use crate::tools::schema::{FieldType, InputSchema};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, SecondsFormat, Utc};
use semver::Version;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt::Write as _;

/// Timestamps above this magnitude are read as milliseconds.
const MILLIS_THRESHOLD: u64 = 100_000_000_000;

/// Timestamp converter tool executor.
///
/// Reads the clock only when no timestamp is given and to phrase the
/// relative time.
#[derive(Debug, Clone)]
pub struct TimestampConverterTool {
    clock: fn() -> DateTime<Utc>,
}

impl Default for TimestampConverterTool {
    fn default() -> Self {
        Self { clock: Utc::now }
    }
}

/// Arguments for the timestamp converter tool.
#[derive(Debug, Deserialize)]
struct TimestampArgs {
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    format: Option<String>,
}

impl TimestampConverterTool {
    /// Registry name of this tool.
    pub const NAME: &'static str = "timestamp-converter";

    /// Creates a converter reading the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a converter with a fixed clock.
    #[must_use]
    pub fn with_clock(clock: fn() -> DateTime<Utc>) -> Self {
        Self { clock }
    }

    /// Returns the descriptor for registration.
    #[must_use]
    pub fn descriptor() -> ToolDescriptor {
        ToolDescriptor::new(
            Self::NAME,
            Version::new(1, 0, 0),
            EntryLocation::builtin(Self::NAME).to_string(),
        )
        .with_description(
            "Convert a Unix timestamp (seconds or milliseconds) to an ISO 8601 date and a relative phrase. Uses the current time when no timestamp is given.",
        )
        .with_schema(
            InputSchema::new()
                .optional(
                    "timestamp",
                    FieldType::Integer,
                    "Seconds since the Unix epoch; values above 10^11 are milliseconds",
                )
                .optional(
                    "format",
                    FieldType::String,
                    "Optional strftime pattern for the 'date' field",
                ),
        )
    }

    fn to_datetime(timestamp: i64) -> Result<DateTime<Utc>, ToolError> {
        let converted = if timestamp.unsigned_abs() > MILLIS_THRESHOLD {
            DateTime::from_timestamp_millis(timestamp)
        } else {
            DateTime::from_timestamp(timestamp, 0)
        };
        converted.ok_or_else(|| {
            ToolError::fault(Self::NAME, format!("timestamp {timestamp} is out of range"))
        })
    }

    fn format_date(date: &DateTime<Utc>, pattern: Option<&str>) -> Result<String, ToolError> {
        let Some(pattern) = pattern else {
            return Ok(date.to_rfc3339_opts(SecondsFormat::Millis, true));
        };

        let items: Vec<Item<'_>> = StrftimeItems::new(pattern).collect();
        if items.iter().any(|item| matches!(item, Item::Error)) {
            return Err(ToolError::fault(
                Self::NAME,
                format!("invalid format pattern '{pattern}'"),
            ));
        }

        let mut out = String::new();
        write!(out, "{}", date.format_with_items(items.into_iter())).map_err(|_| {
            ToolError::fault(Self::NAME, format!("format pattern '{pattern}' cannot be applied"))
        })?;
        Ok(out)
    }
}

/// Phrases the distance from `now` to `then`, e.g. `"3 months ago"`.
fn relative_phrase(then: &DateTime<Utc>, now: &DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(*then).num_seconds();
    let magnitude = delta.unsigned_abs();

    if magnitude < 45 {
        return "just now".to_string();
    }

    let (count, unit) = match magnitude {
        s if s < 3_600 => ((s + 30) / 60, "minute"),
        s if s < 86_400 => ((s + 1_800) / 3_600, "hour"),
        s if s < 30 * 86_400 => ((s + 43_200) / 86_400, "day"),
        s if s < 365 * 86_400 => (s / (30 * 86_400), "month"),
        s => (s / (365 * 86_400), "year"),
    };
    let count = count.max(1);
    let plural = if count == 1 { "" } else { "s" };

    if delta > 0 {
        format!("{count} {unit}{plural} ago")
    } else {
        format!("in {count} {unit}{plural}")
    }
}

impl Tool for TimestampConverterTool {
    fn entry(&self, input: Value) -> ToolFuture {
        let now = (self.clock)();

        Box::pin(async move {
            let args: TimestampArgs = serde_json::from_value(input)
                .map_err(|e| ToolError::validation("input", format!("invalid arguments: {e}")))?;

            let timestamp = args.timestamp.unwrap_or_else(|| now.timestamp());
            let date = Self::to_datetime(timestamp)?;

            Ok(json!({
                "timestamp": timestamp,
                "date": Self::format_date(&date, args.format.as_deref())?,
                "relative": relative_phrase(&date, &now),
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_743_465_600, 0).unwrap() // 2025-04-01T00:00:00Z
    }

    #[tokio::test]
    async fn converts_new_year_2025() {
        let tool = TimestampConverterTool::with_clock(fixed_now);
        let result = tool.entry(json!({"timestamp": 1_735_689_600})).await.unwrap();
        assert_eq!(result["date"], "2025-01-01T00:00:00.000Z");
        assert_eq!(result["timestamp"], 1_735_689_600);
        assert_eq!(result["relative"], "3 months ago");
    }

    #[tokio::test]
    async fn conversion_is_stable_across_calls() {
        let tool = TimestampConverterTool::new();
        let first = tool.entry(json!({"timestamp": 1_735_689_600})).await.unwrap();
        let second = tool.entry(json!({"timestamp": 1_735_689_600})).await.unwrap();
        assert_eq!(first["date"], second["date"]);
    }

    #[tokio::test]
    async fn milliseconds_are_detected() {
        let tool = TimestampConverterTool::with_clock(fixed_now);
        let result = tool
            .entry(json!({"timestamp": 1_735_689_600_123_i64}))
            .await
            .unwrap();
        assert_eq!(result["date"], "2025-01-01T00:00:00.123Z");
    }

    #[tokio::test]
    async fn extreme_timestamps_are_out_of_range() {
        let tool = TimestampConverterTool::with_clock(fixed_now);
        for extreme in [i64::MIN, i64::MAX] {
            let error = tool
                .entry(json!({ "timestamp": extreme }))
                .await
                .unwrap_err();
            assert!(error.is_fault());
            assert!(error.result_message().contains("out of range"), "{error}");
        }
    }

    #[tokio::test]
    async fn missing_timestamp_uses_clock() {
        let tool = TimestampConverterTool::with_clock(fixed_now);
        let result = tool.entry(json!({})).await.unwrap();
        assert_eq!(result["timestamp"], 1_743_465_600);
        assert_eq!(result["relative"], "just now");
    }

    #[tokio::test]
    async fn custom_format() {
        let tool = TimestampConverterTool::with_clock(fixed_now);
        let result = tool
            .entry(json!({"timestamp": 1_735_689_600, "format": "%Y/%m/%d"}))
            .await
            .unwrap();
        assert_eq!(result["date"], "2025/01/01");
    }

    #[tokio::test]
    async fn invalid_format_is_a_fault() {
        let tool = TimestampConverterTool::with_clock(fixed_now);
        let error = tool
            .entry(json!({"timestamp": 0, "format": "%Y %"}))
            .await
            .unwrap_err();
        assert!(error.result_message().contains("invalid format pattern"));
    }

    #[test]
    fn relative_phrases() {
        let now = fixed_now();
        let at = |offset: i64| DateTime::from_timestamp(now.timestamp() + offset, 0).unwrap();
        assert_eq!(relative_phrase(&at(-10), &now), "just now");
        assert_eq!(relative_phrase(&at(-120), &now), "2 minutes ago");
        assert_eq!(relative_phrase(&at(-3_600), &now), "1 hour ago");
        assert_eq!(relative_phrase(&at(2 * 86_400), &now), "in 2 days");
        assert_eq!(relative_phrase(&at(-800 * 86_400), &now), "2 years ago");
    }
}
