//! Repository for the `import_records` table.

use sqlx::PgPool;
use shipwatch_core::import_status::ImportStatus;
use shipwatch_core::types::DbId;

use crate::models::import_record::{ImportRecord, ImportTotals};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, file_name, status, total_rows, success_rows, \
    failed_rows, skipped_rows, errors, created_by, started_at, completed_at, \
    created_at, updated_at";

/// Provides bookkeeping for batch imports.
pub struct ImportRecordRepo;

impl ImportRecordRepo {
    /// Open a record in `processing` status.
    pub async fn create(
        pool: &PgPool,
        file_name: Option<&str>,
        total_rows: i32,
        created_by: Option<DbId>,
    ) -> Result<ImportRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO import_records (file_name, status, total_rows, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportRecord>(&query)
            .bind(file_name)
            .bind(ImportStatus::Processing.as_str())
            .bind(total_rows)
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    /// Write final totals and stamp `completed_at`.
    pub async fn finalize(
        pool: &PgPool,
        id: DbId,
        totals: &ImportTotals,
    ) -> Result<ImportRecord, sqlx::Error> {
        let errors = serde_json::to_value(&totals.errors)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        let query = format!(
            "UPDATE import_records
             SET status = $2, total_rows = $3, success_rows = $4, failed_rows = $5,
                 skipped_rows = $6, errors = $7, completed_at = NOW(), updated_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ImportRecord>(&query)
            .bind(id)
            .bind(totals.status.as_str())
            .bind(to_i32(totals.total_rows))
            .bind(to_i32(totals.success_rows))
            .bind(to_i32(totals.failed_rows))
            .bind(to_i32(totals.skipped_rows))
            .bind(errors)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ImportRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM import_records WHERE id = $1");
        sqlx::query_as::<_, ImportRecord>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

fn to_i32(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}
