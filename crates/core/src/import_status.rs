//! Import record status and its derivation from row totals.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Lifecycle of a batch import record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportStatus {
    /// Rows are being written; the final status is not known yet.
    Processing,
    /// No row failed.
    Completed,
    /// Some rows succeeded and some failed.
    Partial,
    /// Rows failed and none succeeded.
    Failed,
}

impl ImportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    /// Derive the final status of an import from its row totals.
    ///
    /// Skipped rows (exact duplicates of stored readings) count as neither
    /// success nor failure, so an import whose rows were all skipped is
    /// `Completed`.
    pub fn from_totals(success_rows: usize, failed_rows: usize) -> Self {
        match (success_rows, failed_rows) {
            (_, 0) => Self::Completed,
            (0, _) => Self::Failed,
            _ => Self::Partial,
        }
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "partial" => Ok(Self::Partial),
            "failed" => Ok(Self::Failed),
            other => Err(CoreError::Validation(format!(
                "Unknown import status '{other}'"
            ))),
        }
    }
}
