//! PostgreSQL implementations of the store and collaborator traits.

use std::collections::HashSet;

use async_trait::async_trait;
use shipwatch_core::equipment::{EquipmentLookup, LookupError, MonitoringPointCatalog, PointVerdict};
use shipwatch_core::reading::ReadingSource;
use shipwatch_core::types::{DbId, Timestamp};
use shipwatch_db::models::alarm_record::{AlarmRecord, NewAlarmRecord, SeverityCount};
use shipwatch_db::models::import_record::{ImportRecord, ImportRowError, ImportTotals};
use shipwatch_db::models::reading::{NewReading, Reading};
use shipwatch_db::models::threshold_rule::ThresholdRule;
use shipwatch_db::repositories::{
    AlarmRecordRepo, EquipmentRepo, ImportRecordRepo, MonitoringPointRepo, ReadingRepo,
    ThresholdRuleRepo,
};
use sqlx::PgPool;

use super::{AlarmStore, ChunkOutcome, ImportRecordStore, PendingRow, ReadingStore, RuleStore};
use crate::error::StoreError;

/// All four stores over one pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RuleStore for PgStore {
    async fn find_enabled_matching(
        &self,
        equipment_id: &str,
        metric_type: &str,
        monitoring_point: Option<&str>,
    ) -> Result<Vec<ThresholdRule>, StoreError> {
        let rules = ThresholdRuleRepo::find_enabled_matching(
            &self.pool,
            equipment_id,
            metric_type,
            monitoring_point,
        )
        .await?;
        Ok(rules)
    }
}

#[async_trait]
impl AlarmStore for PgStore {
    async fn create(&self, alarm: &NewAlarmRecord) -> Result<AlarmRecord, StoreError> {
        Ok(AlarmRecordRepo::create(&self.pool, alarm).await?)
    }

    async fn severity_counts(
        &self,
        equipment_id: &str,
        since: Timestamp,
    ) -> Result<Vec<SeverityCount>, StoreError> {
        Ok(AlarmRecordRepo::severity_counts(&self.pool, equipment_id, since).await?)
    }
}

#[async_trait]
impl ReadingStore for PgStore {
    async fn persist_chunk(
        &self,
        import_record_id: DbId,
        rows: &[PendingRow],
        skip_invalid: bool,
    ) -> Result<ChunkOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;
        let mut outcome = ChunkOutcome::default();

        for pending in rows {
            if skip_invalid {
                // Savepoint per row so one refused insert does not poison the
                // surrounding transaction.
                sqlx::query("SAVEPOINT import_row").execute(&mut *tx).await?;
                let inserted = ReadingRepo::insert(
                    &mut *tx,
                    &pending.reading,
                    ReadingSource::Import,
                    Some(import_record_id),
                )
                .await;
                match inserted {
                    Ok(row) => {
                        sqlx::query("RELEASE SAVEPOINT import_row")
                            .execute(&mut *tx)
                            .await?;
                        match row {
                            Some(reading) => outcome.persisted.push(reading),
                            None => outcome.skipped += 1,
                        }
                    }
                    Err(e) => {
                        sqlx::query("ROLLBACK TO SAVEPOINT import_row")
                            .execute(&mut *tx)
                            .await?;
                        outcome.failures.push(ImportRowError {
                            row: pending.row,
                            data: pending.raw.clone(),
                            reason: e.to_string(),
                        });
                    }
                }
            } else {
                let inserted = ReadingRepo::insert(
                    &mut *tx,
                    &pending.reading,
                    ReadingSource::Import,
                    Some(import_record_id),
                )
                .await;
                match inserted {
                    Ok(Some(reading)) => outcome.persisted.push(reading),
                    Ok(None) => outcome.skipped += 1,
                    Err(e) => {
                        tx.rollback().await?;
                        return Err(StoreError::Row {
                            row: pending.row,
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        tx.commit().await?;
        Ok(outcome)
    }

    async fn insert_live(&self, reading: &NewReading) -> Result<Option<Reading>, StoreError> {
        Ok(ReadingRepo::insert(&self.pool, reading, ReadingSource::Live, None).await?)
    }
}

#[async_trait]
impl ImportRecordStore for PgStore {
    async fn create(
        &self,
        file_name: Option<&str>,
        total_rows: usize,
        created_by: Option<DbId>,
    ) -> Result<ImportRecord, StoreError> {
        let total_rows = i32::try_from(total_rows).unwrap_or(i32::MAX);
        Ok(ImportRecordRepo::create(&self.pool, file_name, total_rows, created_by).await?)
    }

    async fn finalize(&self, id: DbId, totals: &ImportTotals) -> Result<ImportRecord, StoreError> {
        Ok(ImportRecordRepo::finalize(&self.pool, id, totals).await?)
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

fn unavailable(e: sqlx::Error) -> LookupError {
    LookupError::Unavailable(e.to_string())
}

/// Equipment lookup backed by the `equipment` table.
#[derive(Clone)]
pub struct PgEquipmentLookup {
    pool: PgPool,
}

impl PgEquipmentLookup {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EquipmentLookup for PgEquipmentLookup {
    async fn lookup_internal_id(&self, external_code: &str) -> Result<Option<String>, LookupError> {
        let equipment = EquipmentRepo::find_by_device_code(&self.pool, external_code)
            .await
            .map_err(unavailable)?;
        Ok(equipment.map(|e| e.id))
    }

    async fn lookup_external_code(&self, internal_id: &str) -> Result<Option<String>, LookupError> {
        let equipment = EquipmentRepo::find_by_id(&self.pool, internal_id)
            .await
            .map_err(unavailable)?;
        Ok(equipment.map(|e| e.device_code))
    }

    async fn existing_ids(&self, internal_ids: &[String]) -> Result<HashSet<String>, LookupError> {
        let ids = EquipmentRepo::existing_ids(&self.pool, internal_ids)
            .await
            .map_err(unavailable)?;
        Ok(ids.into_iter().collect())
    }
}

/// Monitoring-point catalog backed by the `monitoring_points` table.
#[derive(Clone)]
pub struct PgMonitoringPointCatalog {
    pool: PgPool,
}

impl PgMonitoringPointCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MonitoringPointCatalog for PgMonitoringPointCatalog {
    async fn validate(
        &self,
        equipment_id: &str,
        point_name: &str,
        metric_type: &str,
    ) -> Result<PointVerdict, LookupError> {
        let point = MonitoringPointRepo::find(&self.pool, equipment_id, point_name)
            .await
            .map_err(unavailable)?;
        Ok(match point {
            None => PointVerdict::Reject(format!(
                "Monitoring point '{point_name}' is not registered for equipment '{equipment_id}'"
            )),
            Some(p) if p.metric_type != metric_type => PointVerdict::Reject(format!(
                "Monitoring point '{point_name}' measures '{}', not '{metric_type}'",
                p.metric_type
            )),
            Some(_) => PointVerdict::Ok,
        })
    }

    async fn validate_batch(
        &self,
        equipment_id: &str,
        point_names: &[String],
    ) -> Result<Vec<String>, LookupError> {
        MonitoringPointRepo::known_points(&self.pool, equipment_id, point_names)
            .await
            .map_err(unavailable)
    }
}
