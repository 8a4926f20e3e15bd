//! Batch import of historical readings.
//!
//! Rows are validated up front, written in independently committed chunks,
//! then evaluated one by one once every chunk is in. A multi-chunk import is
//! not atomic: a failing chunk leaves earlier chunks committed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shipwatch_core::equipment::{EquipmentLookup, MonitoringPointCatalog};
use shipwatch_core::import_status::ImportStatus;
use shipwatch_core::reading::validate_reading_fields;
use shipwatch_core::types::{DbId, Timestamp};
use shipwatch_db::models::import_record::{ImportRecord, ImportRowError, ImportTotals};
use shipwatch_db::models::reading::{NewReading, Reading};
use shipwatch_events::AlarmNotifier;

use crate::error::{PipelineError, StoreError};
use crate::evaluator::ThresholdEvaluator;
use crate::store::{ImportRecordStore, PendingRow, ReadingStore};

/// Rows per chunk transaction.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// A parsed batch handed over by the file-format layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub file_name: Option<String>,
    #[serde(default)]
    pub skip_invalid_rows: bool,
    /// Raw rows, in file order. Each is parsed as a reading; rows that do
    /// not parse are validation errors.
    pub readings: Vec<serde_json::Value>,
}

/// Outcome returned to the caller of an import.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub import_record_id: DbId,
    pub status: ImportStatus,
    pub total_rows: usize,
    pub success_rows: usize,
    pub failed_rows: usize,
    pub skipped_rows: usize,
    pub errors: Vec<ImportRowError>,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub alarms_triggered: usize,
    pub evaluation_failures: usize,
}

pub struct IngestionPipeline {
    readings: Arc<dyn ReadingStore>,
    imports: Arc<dyn ImportRecordStore>,
    equipment: Arc<dyn EquipmentLookup>,
    catalog: Arc<dyn MonitoringPointCatalog>,
    evaluator: Arc<ThresholdEvaluator>,
    notifier: Arc<dyn AlarmNotifier>,
    chunk_size: usize,
}

impl IngestionPipeline {
    pub fn new(
        readings: Arc<dyn ReadingStore>,
        imports: Arc<dyn ImportRecordStore>,
        equipment: Arc<dyn EquipmentLookup>,
        catalog: Arc<dyn MonitoringPointCatalog>,
        evaluator: Arc<ThresholdEvaluator>,
        notifier: Arc<dyn AlarmNotifier>,
    ) -> Self {
        Self {
            readings,
            imports,
            equipment,
            catalog,
            evaluator,
            notifier,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Run one import to completion.
    ///
    /// Row-level problems end up in the result's error list. An `Err` is
    /// returned only when the import as a whole is abandoned: a row failed
    /// with `skip_invalid_rows` off, a chunk transaction failed, or a
    /// backend was unreachable. The import record is finalized whenever it
    /// was created.
    pub async fn import(
        &self,
        request: ImportRequest,
        created_by: Option<DbId>,
    ) -> Result<ImportResult, PipelineError> {
        let ImportRequest {
            file_name,
            skip_invalid_rows,
            readings,
        } = request;
        let total_rows = readings.len();

        let record = self
            .imports
            .create(file_name.as_deref(), total_rows, created_by)
            .await?;
        let import_record_id = record.id;

        tracing::info!(
            import_record_id,
            total_rows,
            skip_invalid_rows,
            "Import started",
        );

        // -- Validation --------------------------------------------------

        let (accepted, mut errors) = match self.validate_rows(readings).await {
            Ok(split) => split,
            Err(e) => {
                self.abandon(import_record_id, total_rows, 0, 0, Vec::new()).await;
                return Err(e);
            }
        };
        self.warn_unknown_points(import_record_id, &accepted).await;

        if !skip_invalid_rows {
            if let Some(first) = errors.first().cloned() {
                tracing::warn!(
                    import_record_id,
                    row = first.row,
                    reason = %first.reason,
                    "Import rejected, invalid row with skip_invalid_rows off",
                );
                self.abandon(import_record_id, total_rows, 0, 0, errors).await;
                return Err(PipelineError::RowRejected {
                    import_record_id,
                    row: first.row,
                    reason: first.reason,
                });
            }
        }

        // -- Chunked persistence -----------------------------------------

        let mut persisted: Vec<Reading> = Vec::with_capacity(accepted.len());
        let mut skipped_rows = 0;

        for (index, chunk) in accepted.chunks(self.chunk_size).enumerate() {
            match self
                .readings
                .persist_chunk(import_record_id, chunk, skip_invalid_rows)
                .await
            {
                Ok(outcome) => {
                    tracing::debug!(
                        import_record_id,
                        chunk = index,
                        persisted = outcome.persisted.len(),
                        skipped = outcome.skipped,
                        failed = outcome.failures.len(),
                        "Chunk committed",
                    );
                    persisted.extend(outcome.persisted);
                    skipped_rows += outcome.skipped;
                    errors.extend(outcome.failures);
                }
                Err(source) => {
                    tracing::error!(
                        import_record_id,
                        chunk = index,
                        error = %source,
                        "Chunk failed, aborting remaining chunks",
                    );
                    let first_row = chunk.first().map(|p| p.row).unwrap_or_default();
                    let (row, data) = match &source {
                        StoreError::Row { row, .. } => (
                            *row,
                            chunk
                                .iter()
                                .find(|p| p.row == *row)
                                .map(|p| p.raw.clone())
                                .unwrap_or_default(),
                        ),
                        _ => (first_row, serde_json::Value::Null),
                    };
                    errors.push(ImportRowError {
                        row,
                        data,
                        reason: source.to_string(),
                    });
                    self.abandon(
                        import_record_id,
                        total_rows,
                        persisted.len(),
                        skipped_rows,
                        errors,
                    )
                    .await;
                    return Err(PipelineError::Chunk {
                        import_record_id,
                        chunk: index,
                        source,
                    });
                }
            }
            tokio::task::yield_now().await;
        }

        // -- Evaluation (best-effort) ------------------------------------

        let mut alarms = Vec::new();
        let mut evaluation_failures = 0;
        for reading in &persisted {
            let outcome = self.evaluator.try_evaluate(reading).await;
            if !outcome.is_clean() {
                evaluation_failures += 1;
                for e in &outcome.errors {
                    tracing::warn!(
                        import_record_id,
                        reading_id = reading.id,
                        error = %e,
                        "Evaluation failed for imported reading",
                    );
                }
            }
            alarms.extend(outcome.alarms);
            tokio::task::yield_now().await;
        }

        if let Err(e) = self.notifier.push_batch(&alarms).await {
            tracing::warn!(import_record_id, error = %e, "Failed to push import alarms");
        }

        // -- Finalize ----------------------------------------------------

        let success_rows = persisted.len();
        let failed_rows = errors.len();
        let totals = ImportTotals {
            status: ImportStatus::from_totals(success_rows, failed_rows),
            total_rows,
            success_rows,
            failed_rows,
            skipped_rows,
            errors,
        };
        let finalized = self.imports.finalize(import_record_id, &totals).await?;

        tracing::info!(
            import_record_id,
            status = %totals.status,
            success_rows,
            failed_rows,
            skipped_rows,
            alarms_triggered = alarms.len(),
            evaluation_failures,
            "Import finished",
        );

        Ok(result_from(finalized, totals, alarms.len(), evaluation_failures))
    }

    /// Parse and check every row. Returns the accepted rows in order and one
    /// error per rejected row.
    async fn validate_rows(
        &self,
        rows: Vec<serde_json::Value>,
    ) -> Result<(Vec<PendingRow>, Vec<ImportRowError>), PipelineError> {
        let mut parsed = Vec::with_capacity(rows.len());
        let mut errors = Vec::new();

        for (index, raw) in rows.into_iter().enumerate() {
            let row = index + 1;
            let reading = match serde_json::from_value::<NewReading>(raw.clone()) {
                Ok(reading) => reading,
                Err(e) => {
                    errors.push(ImportRowError {
                        row,
                        data: raw,
                        reason: format!("Malformed reading: {e}"),
                    });
                    continue;
                }
            };
            if let Err(e) =
                validate_reading_fields(&reading.equipment_id, &reading.metric_type, reading.value)
            {
                errors.push(ImportRowError {
                    row,
                    data: raw,
                    reason: e.to_string(),
                });
                continue;
            }
            parsed.push(PendingRow { row, reading, raw });
        }

        let referenced: Vec<String> = parsed
            .iter()
            .map(|p| p.reading.equipment_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let existing = self.equipment.existing_ids(&referenced).await?;

        let mut accepted = Vec::with_capacity(parsed.len());
        for pending in parsed {
            if existing.contains(&pending.reading.equipment_id) {
                accepted.push(pending);
            } else {
                errors.push(ImportRowError {
                    row: pending.row,
                    reason: format!("Unknown equipment '{}'", pending.reading.equipment_id),
                    data: pending.raw,
                });
            }
        }
        errors.sort_by_key(|e| e.row);
        Ok((accepted, errors))
    }

    /// Log monitoring points the catalog does not know. Never fails a row.
    async fn warn_unknown_points(&self, import_record_id: DbId, rows: &[PendingRow]) {
        let mut by_equipment: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
        for pending in rows {
            if let Some(point) = &pending.reading.monitoring_point {
                by_equipment
                    .entry(pending.reading.equipment_id.as_str())
                    .or_default()
                    .insert(point.clone());
            }
        }

        for (equipment_id, points) in by_equipment {
            let names: Vec<String> = points.into_iter().collect();
            match self.catalog.validate_batch(equipment_id, &names).await {
                Ok(known) => {
                    for name in names.iter().filter(|n| !known.contains(n)) {
                        tracing::warn!(
                            import_record_id,
                            equipment_id,
                            monitoring_point = %name,
                            "Monitoring point not in catalog",
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        import_record_id,
                        equipment_id,
                        error = %e,
                        "Monitoring point catalog unavailable",
                    );
                }
            }
        }
    }

    /// Finalize an abandoned import. Rows neither persisted nor skipped
    /// count as failed.
    async fn abandon(
        &self,
        import_record_id: DbId,
        total_rows: usize,
        success_rows: usize,
        skipped_rows: usize,
        errors: Vec<ImportRowError>,
    ) {
        let failed_rows = total_rows.saturating_sub(success_rows + skipped_rows);
        let totals = ImportTotals {
            status: ImportStatus::from_totals(success_rows, failed_rows),
            total_rows,
            success_rows,
            failed_rows,
            skipped_rows,
            errors,
        };
        if let Err(e) = self.imports.finalize(import_record_id, &totals).await {
            tracing::error!(import_record_id, error = %e, "Failed to finalize abandoned import");
        }
    }
}

fn result_from(
    record: ImportRecord,
    totals: ImportTotals,
    alarms_triggered: usize,
    evaluation_failures: usize,
) -> ImportResult {
    ImportResult {
        import_record_id: record.id,
        status: totals.status,
        total_rows: totals.total_rows,
        success_rows: totals.success_rows,
        failed_rows: totals.failed_rows,
        skipped_rows: totals.skipped_rows,
        errors: totals.errors,
        started_at: record.started_at,
        completed_at: record.completed_at,
        alarms_triggered,
        evaluation_failures,
    }
}
