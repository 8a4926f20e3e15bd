//! Alarm record rows.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use shipwatch_core::alarm::{AlarmStatus, Severity};
use shipwatch_core::error::CoreError;
use shipwatch_core::types::{DbId, Timestamp};

/// A row from the `alarm_records` table.
///
/// `monitoring_point`, `fault_name` and `recommended_action` are copies of
/// the triggering rule's values at trigger time, not live references.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmRecord {
    pub id: DbId,
    pub equipment_id: String,
    pub threshold_id: Option<DbId>,
    pub abnormal_metric_type: String,
    pub abnormal_value: f64,
    pub threshold_range: String,
    pub triggered_at: Timestamp,
    pub severity: String,
    pub status: String,
    pub monitoring_point: Option<String>,
    pub fault_name: Option<String>,
    pub recommended_action: Option<String>,
    pub handler: Option<String>,
    pub handled_at: Option<Timestamp>,
    pub handle_note: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AlarmRecord {
    pub fn severity(&self) -> Result<Severity, CoreError> {
        self.severity.parse()
    }

    pub fn status(&self) -> Result<AlarmStatus, CoreError> {
        self.status.parse()
    }
}

/// DTO for inserting an alarm produced by the evaluator.
#[derive(Debug, Clone)]
pub struct NewAlarmRecord {
    pub equipment_id: String,
    pub threshold_id: DbId,
    pub abnormal_metric_type: String,
    pub abnormal_value: f64,
    pub threshold_range: String,
    pub triggered_at: Timestamp,
    pub severity: Severity,
    pub monitoring_point: Option<String>,
    pub fault_name: Option<String>,
    pub recommended_action: Option<String>,
}

/// Operator request to move an alarm through its lifecycle.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAlarmStatus {
    pub status: AlarmStatus,
    pub handle_note: Option<String>,
}

/// Alarm count for one severity, used by the trend aggregate.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SeverityCount {
    pub severity: String,
    pub count: i64,
}
