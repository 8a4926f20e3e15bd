//! In-memory stores and collaborators for pipeline tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use shipwatch_core::alarm::AlarmStatus;
use shipwatch_core::equipment::{EquipmentLookup, LookupError, MonitoringPointCatalog, PointVerdict};
use shipwatch_core::import_status::ImportStatus;
use shipwatch_core::reading::ReadingSource;
use shipwatch_core::threshold::monitoring_point_matches;
use shipwatch_core::types::{DbId, Timestamp};
use shipwatch_db::models::alarm_record::{AlarmRecord, NewAlarmRecord, SeverityCount};
use shipwatch_db::models::import_record::{ImportRecord, ImportRowError, ImportTotals};
use shipwatch_db::models::reading::{NewReading, Reading};
use shipwatch_db::models::threshold_rule::{ThresholdRule, RULE_STATUS_DISABLED, RULE_STATUS_ENABLED};
use shipwatch_events::protocol::TrendPayload;
use shipwatch_events::{AlarmNotifier, EquipmentIdCache, NotifyError};
use shipwatch_pipeline::store::{
    AlarmStore, ChunkOutcome, ImportRecordStore, PendingRow, ReadingStore, RuleStore,
};
use shipwatch_pipeline::{IngestionPipeline, LiveIngestor, StoreError, ThresholdEvaluator};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn at(hour: u32) -> Timestamp {
    Utc.with_ymd_and_hms(2025, 3, 1, hour, 0, 0).unwrap()
}

pub fn rule(id: DbId, point: Option<&str>, upper: Option<f64>, lower: Option<f64>) -> ThresholdRule {
    ThresholdRule {
        id,
        equipment_id: "E1".into(),
        metric_type: "voltage".into(),
        monitoring_point: point.map(str::to_string),
        upper_limit: upper,
        lower_limit: lower,
        duration_seconds: 0,
        severity: "high".into(),
        status: RULE_STATUS_ENABLED.into(),
        fault_name: Some("Overvoltage".into()),
        recommended_action: Some("Check rectifier".into()),
        created_by: None,
        updated_by: None,
        created_at: at(0),
        updated_at: at(0),
        deleted_at: None,
    }
}

pub fn disabled(mut rule: ThresholdRule) -> ThresholdRule {
    rule.status = RULE_STATUS_DISABLED.into();
    rule
}

pub fn new_reading(equipment_id: &str, point: Option<&str>, value: f64, hour: u32) -> NewReading {
    NewReading {
        equipment_id: equipment_id.into(),
        recorded_at: at(hour),
        metric_type: "voltage".into(),
        monitoring_point: point.map(str::to_string),
        value,
        unit: Some("V".into()),
        quality: None,
    }
}

pub fn raw(reading: &NewReading) -> serde_json::Value {
    serde_json::to_value(reading).unwrap()
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct State {
    rules: Vec<ThresholdRule>,
    readings: Vec<Reading>,
    alarms: Vec<AlarmRecord>,
    imports: HashMap<DbId, ImportRecord>,
    next_id: DbId,
}

impl State {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn is_duplicate(&self, r: &NewReading) -> bool {
        self.readings.iter().any(|s| {
            s.equipment_id == r.equipment_id
                && s.metric_type == r.metric_type
                && s.monitoring_point == r.monitoring_point
                && s.recorded_at == r.recorded_at
        })
    }

    fn to_reading(&mut self, r: &NewReading, source: ReadingSource, import: Option<DbId>) -> Reading {
        Reading {
            id: self.next_id(),
            equipment_id: r.equipment_id.clone(),
            recorded_at: r.recorded_at,
            metric_type: r.metric_type.clone(),
            monitoring_point: r.monitoring_point.clone(),
            value: r.value,
            unit: r.unit.clone(),
            quality: r.quality.clone(),
            source: source.as_str().into(),
            import_record_id: import,
            created_at: Utc::now(),
        }
    }
}

/// Every store trait over one shared in-memory state.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    /// Equipment ids whose rule lookups fail.
    pub failing_rule_lookups: Mutex<HashSet<String>>,
    /// Rule ids whose alarm inserts fail.
    pub failing_alarm_rules: Mutex<HashSet<DbId>>,
    /// Rows the "database" refuses on insert.
    pub refused_rows: Mutex<HashSet<usize>>,
    /// Chunk index (0-based) whose transaction fails outright.
    pub failing_chunk: Mutex<Option<usize>>,
    pub chunk_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn with_rules(rules: Vec<ThresholdRule>) -> Arc<Self> {
        let store = Self::default();
        store.state.lock().unwrap().rules = rules;
        Arc::new(store)
    }

    pub fn readings(&self) -> Vec<Reading> {
        self.state.lock().unwrap().readings.clone()
    }

    pub fn alarms(&self) -> Vec<AlarmRecord> {
        self.state.lock().unwrap().alarms.clone()
    }

    pub fn import(&self, id: DbId) -> Option<ImportRecord> {
        self.state.lock().unwrap().imports.get(&id).cloned()
    }

    pub fn edit_rule(&self, id: DbId, edit: impl FnOnce(&mut ThresholdRule)) {
        let mut state = self.state.lock().unwrap();
        if let Some(rule) = state.rules.iter_mut().find(|r| r.id == id) {
            edit(rule);
        }
    }
}

fn db_down() -> StoreError {
    StoreError::Sqlx(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl RuleStore for MemoryStore {
    async fn find_enabled_matching(
        &self,
        equipment_id: &str,
        metric_type: &str,
        monitoring_point: Option<&str>,
    ) -> Result<Vec<ThresholdRule>, StoreError> {
        if self.failing_rule_lookups.lock().unwrap().contains(equipment_id) {
            return Err(db_down());
        }
        let state = self.state.lock().unwrap();
        Ok(state
            .rules
            .iter()
            .filter(|r| {
                r.is_enabled()
                    && r.equipment_id == equipment_id
                    && r.metric_type == metric_type
                    && monitoring_point_matches(r.monitoring_point.as_deref(), monitoring_point)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AlarmStore for MemoryStore {
    async fn create(&self, alarm: &NewAlarmRecord) -> Result<AlarmRecord, StoreError> {
        if self.failing_alarm_rules.lock().unwrap().contains(&alarm.threshold_id) {
            return Err(db_down());
        }
        let mut state = self.state.lock().unwrap();
        let record = AlarmRecord {
            id: state.next_id(),
            equipment_id: alarm.equipment_id.clone(),
            threshold_id: Some(alarm.threshold_id),
            abnormal_metric_type: alarm.abnormal_metric_type.clone(),
            abnormal_value: alarm.abnormal_value,
            threshold_range: alarm.threshold_range.clone(),
            triggered_at: alarm.triggered_at,
            severity: alarm.severity.as_str().into(),
            status: AlarmStatus::Pending.as_str().into(),
            monitoring_point: alarm.monitoring_point.clone(),
            fault_name: alarm.fault_name.clone(),
            recommended_action: alarm.recommended_action.clone(),
            handler: None,
            handled_at: None,
            handle_note: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        state.alarms.push(record.clone());
        Ok(record)
    }

    async fn severity_counts(
        &self,
        equipment_id: &str,
        since: Timestamp,
    ) -> Result<Vec<SeverityCount>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut counts: HashMap<String, i64> = HashMap::new();
        for alarm in state
            .alarms
            .iter()
            .filter(|a| a.equipment_id == equipment_id && a.triggered_at >= since)
        {
            *counts.entry(alarm.severity.clone()).or_default() += 1;
        }
        let mut counts: Vec<SeverityCount> = counts
            .into_iter()
            .map(|(severity, count)| SeverityCount { severity, count })
            .collect();
        counts.sort_by(|a, b| a.severity.cmp(&b.severity));
        Ok(counts)
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    async fn persist_chunk(
        &self,
        import_record_id: DbId,
        rows: &[PendingRow],
        skip_invalid: bool,
    ) -> Result<ChunkOutcome, StoreError> {
        let index = self.chunk_calls.fetch_add(1, Ordering::SeqCst);
        if *self.failing_chunk.lock().unwrap() == Some(index) {
            return Err(db_down());
        }
        let refused = self.refused_rows.lock().unwrap().clone();

        // Stage on a copy so a failed chunk leaves nothing behind.
        let mut state = self.state.lock().unwrap();
        let mut staged: Vec<Reading> = Vec::new();
        let mut outcome = ChunkOutcome::default();
        for pending in rows {
            if refused.contains(&pending.row) {
                if !skip_invalid {
                    return Err(StoreError::Row {
                        row: pending.row,
                        reason: "constraint violation".into(),
                    });
                }
                outcome.failures.push(ImportRowError {
                    row: pending.row,
                    data: pending.raw.clone(),
                    reason: "constraint violation".into(),
                });
                continue;
            }
            let duplicate_in_chunk = staged.iter().any(|s| {
                s.equipment_id == pending.reading.equipment_id
                    && s.metric_type == pending.reading.metric_type
                    && s.monitoring_point == pending.reading.monitoring_point
                    && s.recorded_at == pending.reading.recorded_at
            });
            if state.is_duplicate(&pending.reading) || duplicate_in_chunk {
                outcome.skipped += 1;
                continue;
            }
            let reading = state.to_reading(&pending.reading, ReadingSource::Import, Some(import_record_id));
            staged.push(reading);
        }
        state.readings.extend(staged.iter().cloned());
        outcome.persisted = staged;
        Ok(outcome)
    }

    async fn insert_live(&self, reading: &NewReading) -> Result<Option<Reading>, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.is_duplicate(reading) {
            return Ok(None);
        }
        let stored = state.to_reading(reading, ReadingSource::Live, None);
        state.readings.push(stored.clone());
        Ok(Some(stored))
    }
}

#[async_trait]
impl ImportRecordStore for MemoryStore {
    async fn create(
        &self,
        file_name: Option<&str>,
        total_rows: usize,
        created_by: Option<DbId>,
    ) -> Result<ImportRecord, StoreError> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let record = ImportRecord {
            id: state.next_id(),
            file_name: file_name.map(str::to_string),
            status: ImportStatus::Processing.as_str().into(),
            total_rows: total_rows as i32,
            success_rows: 0,
            failed_rows: 0,
            skipped_rows: 0,
            errors: serde_json::json!([]),
            created_by,
            started_at: now,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        state.imports.insert(record.id, record.clone());
        Ok(record)
    }

    async fn finalize(&self, id: DbId, totals: &ImportTotals) -> Result<ImportRecord, StoreError> {
        let mut state = self.state.lock().unwrap();
        let record = state.imports.get_mut(&id).ok_or(sqlx::Error::RowNotFound)?;
        record.status = totals.status.as_str().into();
        record.total_rows = totals.total_rows as i32;
        record.success_rows = totals.success_rows as i32;
        record.failed_rows = totals.failed_rows as i32;
        record.skipped_rows = totals.skipped_rows as i32;
        record.errors = serde_json::to_value(&totals.errors).unwrap();
        record.completed_at = Some(Utc::now());
        Ok(record.clone())
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Knows "E1" (device "DEV-001") and "E2" (device "DEV-002"). The catalog
/// only registers the "total" point on E1.
#[derive(Default)]
pub struct FakeEquipment;

#[async_trait]
impl EquipmentLookup for FakeEquipment {
    async fn lookup_internal_id(&self, code: &str) -> Result<Option<String>, LookupError> {
        Ok(match code {
            "DEV-001" => Some("E1".into()),
            "DEV-002" => Some("E2".into()),
            _ => None,
        })
    }

    async fn lookup_external_code(&self, id: &str) -> Result<Option<String>, LookupError> {
        Ok(match id {
            "E1" => Some("DEV-001".into()),
            "E2" => Some("DEV-002".into()),
            _ => None,
        })
    }

    async fn existing_ids(&self, ids: &[String]) -> Result<HashSet<String>, LookupError> {
        Ok(ids.iter().filter(|id| *id == "E1" || *id == "E2").cloned().collect())
    }
}

#[async_trait]
impl MonitoringPointCatalog for FakeEquipment {
    async fn validate(
        &self,
        equipment_id: &str,
        point_name: &str,
        _metric_type: &str,
    ) -> Result<PointVerdict, LookupError> {
        if equipment_id == "E1" && point_name == "total" {
            Ok(PointVerdict::Ok)
        } else {
            Ok(PointVerdict::Reject(format!("unknown point {point_name}")))
        }
    }

    async fn validate_batch(
        &self,
        equipment_id: &str,
        point_names: &[String],
    ) -> Result<Vec<String>, LookupError> {
        Ok(point_names
            .iter()
            .filter(|p| equipment_id == "E1" && *p == "total")
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNotifier {
    pub pushed: Mutex<Vec<AlarmRecord>>,
    pub batches: Mutex<Vec<Vec<AlarmRecord>>>,
    pub trends: Mutex<Vec<TrendPayload>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Default::default()
        })
    }
}

#[async_trait]
impl AlarmNotifier for RecordingNotifier {
    async fn push_alarm(&self, alarm: &AlarmRecord) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Unavailable("offline".into()));
        }
        self.pushed.lock().unwrap().push(alarm.clone());
        Ok(())
    }

    async fn push_batch(&self, alarms: &[AlarmRecord]) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Unavailable("offline".into()));
        }
        if !alarms.is_empty() {
            self.batches.lock().unwrap().push(alarms.to_vec());
        }
        Ok(())
    }

    async fn push_trend(&self, trend: &TrendPayload) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Unavailable("offline".into()));
        }
        self.trends.lock().unwrap().push(trend.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub fn evaluator(store: &Arc<MemoryStore>) -> Arc<ThresholdEvaluator> {
    Arc::new(ThresholdEvaluator::new(store.clone(), store.clone()))
}

pub fn pipeline(store: &Arc<MemoryStore>, notifier: &Arc<RecordingNotifier>) -> IngestionPipeline {
    let equipment = Arc::new(FakeEquipment);
    IngestionPipeline::new(
        store.clone(),
        store.clone(),
        equipment.clone(),
        equipment,
        evaluator(store),
        notifier.clone(),
    )
}

pub fn live(store: &Arc<MemoryStore>, notifier: &Arc<RecordingNotifier>) -> LiveIngestor {
    let equipment = Arc::new(FakeEquipment);
    let cache = Arc::new(EquipmentIdCache::new(equipment.clone(), Duration::from_secs(3600)));
    LiveIngestor::new(
        store.clone(),
        store.clone(),
        equipment.clone(),
        equipment,
        cache,
        evaluator(store),
        notifier.clone(),
    )
}
