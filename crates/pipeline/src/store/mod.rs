//! Persistence seams used by the evaluator and the ingestion paths.
//!
//! [`postgres`] holds the production adapters.

pub mod postgres;

use async_trait::async_trait;
use shipwatch_core::types::{DbId, Timestamp};
use shipwatch_db::models::alarm_record::{AlarmRecord, NewAlarmRecord, SeverityCount};
use shipwatch_db::models::import_record::{ImportRecord, ImportRowError, ImportTotals};
use shipwatch_db::models::reading::{NewReading, Reading};
use shipwatch_db::models::threshold_rule::ThresholdRule;

use crate::error::StoreError;

pub use postgres::{PgEquipmentLookup, PgMonitoringPointCatalog, PgStore};

/// Read side of the rule store.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Enabled, non-deleted rules for exactly this coordinate. A `None`
    /// monitoring point only matches rules without one.
    async fn find_enabled_matching(
        &self,
        equipment_id: &str,
        metric_type: &str,
        monitoring_point: Option<&str>,
    ) -> Result<Vec<ThresholdRule>, StoreError>;
}

#[async_trait]
pub trait AlarmStore: Send + Sync {
    async fn create(&self, alarm: &NewAlarmRecord) -> Result<AlarmRecord, StoreError>;

    async fn severity_counts(
        &self,
        equipment_id: &str,
        since: Timestamp,
    ) -> Result<Vec<SeverityCount>, StoreError>;
}

/// A validated import row waiting to be written.
#[derive(Debug, Clone)]
pub struct PendingRow {
    /// 1-based position in the source batch.
    pub row: usize,
    pub reading: NewReading,
    /// The row exactly as submitted, echoed back in error entries.
    pub raw: serde_json::Value,
}

/// What happened to the rows of one committed chunk.
#[derive(Debug, Default)]
pub struct ChunkOutcome {
    pub persisted: Vec<Reading>,
    /// Exact duplicates of readings already stored.
    pub skipped: usize,
    /// Rows the database refused. Only populated in skip mode.
    pub failures: Vec<ImportRowError>,
}

#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Write one chunk inside a single transaction.
    ///
    /// With `skip_invalid` a refused row is recorded in
    /// [`ChunkOutcome::failures`] and the chunk carries on. Without it the
    /// first refused row rolls the whole chunk back and is returned as
    /// [`StoreError::Row`].
    async fn persist_chunk(
        &self,
        import_record_id: DbId,
        rows: &[PendingRow],
        skip_invalid: bool,
    ) -> Result<ChunkOutcome, StoreError>;

    /// Write one live reading. `None` when an identical reading exists.
    async fn insert_live(&self, reading: &NewReading) -> Result<Option<Reading>, StoreError>;
}

#[async_trait]
pub trait ImportRecordStore: Send + Sync {
    async fn create(
        &self,
        file_name: Option<&str>,
        total_rows: usize,
        created_by: Option<DbId>,
    ) -> Result<ImportRecord, StoreError>;

    async fn finalize(&self, id: DbId, totals: &ImportTotals) -> Result<ImportRecord, StoreError>;
}
