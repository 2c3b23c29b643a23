//! Correlation ID for Author workflow runs.

use mti::prelude::*;
use serde::{Serialize, Serializer};
use std::fmt;

/// Identifies one authoring run in its report and log lines.
///
/// Renders as `author_` followed by a time-sortable suffix, so runs sort by
/// start time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthoringId(MagicTypeId);

impl AuthoringId {
    /// Starts a new run ID.
    #[must_use]
    pub fn new() -> Self {
        Self("author".create_type_id::<V7>())
    }
}

impl Default for AuthoringId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuthoringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// Reports carry the ID as its display string.
impl Serialize for AuthoringId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
