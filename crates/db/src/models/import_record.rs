//! Batch import bookkeeping.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use shipwatch_core::import_status::ImportStatus;
use shipwatch_core::types::{DbId, Timestamp};

/// A row from the `import_records` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRecord {
    pub id: DbId,
    pub file_name: Option<String>,
    pub status: String,
    pub total_rows: i32,
    pub success_rows: i32,
    pub failed_rows: i32,
    pub skipped_rows: i32,
    pub errors: serde_json::Value,
    pub created_by: Option<DbId>,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// One rejected row. `row` is 1-based, matching the source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRowError {
    pub row: usize,
    pub data: serde_json::Value,
    pub reason: String,
}

/// Final counters written when an import finishes.
#[derive(Debug, Clone)]
pub struct ImportTotals {
    pub status: ImportStatus,
    pub total_rows: usize,
    pub success_rows: usize,
    pub failed_rows: usize,
    pub skipped_rows: usize,
    pub errors: Vec<ImportRowError>,
}
