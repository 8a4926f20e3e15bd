use shipwatch_core::equipment::LookupError;
use shipwatch_core::error::CoreError;
use shipwatch_core::types::DbId;

/// Failure in a persistence adapter.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A single row could not be written. Only surfaced when the caller asked
    /// for the whole chunk to fail on the first bad row.
    #[error("Row {row} rejected: {reason}")]
    Row { row: usize, reason: String },
}

/// Failure evaluating one reading against its rules.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Rule {rule_id} is malformed: {source}")]
    InvalidRule { rule_id: DbId, source: CoreError },
}

/// Failure at the ingestion boundary.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input itself is unacceptable (live readings only).
    #[error(transparent)]
    Invalid(#[from] CoreError),

    /// A row failed validation while `skipInvalidRows` was off. Nothing was
    /// written; the import record is finalized as failed.
    #[error("Import {import_record_id} aborted at row {row}: {reason}")]
    RowRejected {
        import_record_id: DbId,
        row: usize,
        reason: String,
    },

    /// A chunk transaction failed. Earlier chunks stay committed.
    #[error("Import {import_record_id} aborted in chunk {chunk}: {source}")]
    Chunk {
        import_record_id: DbId,
        chunk: usize,
        source: StoreError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}
