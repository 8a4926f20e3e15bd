//! Reading-level vocabulary shared by live and batch ingestion.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Where a reading entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingSource {
    /// Streaming sensor feed.
    Live,
    /// Bulk historical file import.
    Import,
}

impl ReadingSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Import => "import",
        }
    }
}

impl fmt::Display for ReadingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-level sanity checks on a reading before it is accepted.
///
/// Equipment existence is checked separately because it needs a lookup.
pub fn validate_reading_fields(
    equipment_id: &str,
    metric_type: &str,
    value: f64,
) -> Result<(), CoreError> {
    if equipment_id.trim().is_empty() {
        return Err(CoreError::Validation("equipment_id must not be empty".into()));
    }
    if metric_type.trim().is_empty() {
        return Err(CoreError::Validation("metric_type must not be empty".into()));
    }
    if !value.is_finite() {
        return Err(CoreError::Validation(format!(
            "value must be a finite number, got {value}"
        )));
    }
    Ok(())
}
