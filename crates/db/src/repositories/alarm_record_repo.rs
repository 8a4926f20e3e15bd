//! Repository for the `alarm_records` table.

use sqlx::PgPool;
use shipwatch_core::alarm::AlarmStatus;
use shipwatch_core::types::{DbId, Timestamp};

use crate::models::alarm_record::{AlarmRecord, NewAlarmRecord, SeverityCount};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, equipment_id, threshold_id, abnormal_metric_type, \
    abnormal_value, threshold_range, triggered_at, severity, status, \
    monitoring_point, fault_name, recommended_action, \
    handler, handled_at, handle_note, created_at, updated_at";

/// Provides persistence for alarm records.
pub struct AlarmRecordRepo;

impl AlarmRecordRepo {
    /// Insert a freshly triggered alarm in `pending` status.
    pub async fn create(pool: &PgPool, alarm: &NewAlarmRecord) -> Result<AlarmRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO alarm_records
                (equipment_id, threshold_id, abnormal_metric_type, abnormal_value,
                 threshold_range, triggered_at, severity, status,
                 monitoring_point, fault_name, recommended_action)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlarmRecord>(&query)
            .bind(&alarm.equipment_id)
            .bind(alarm.threshold_id)
            .bind(&alarm.abnormal_metric_type)
            .bind(alarm.abnormal_value)
            .bind(&alarm.threshold_range)
            .bind(alarm.triggered_at)
            .bind(alarm.severity.as_str())
            .bind(AlarmStatus::Pending.as_str())
            .bind(&alarm.monitoring_point)
            .bind(&alarm.fault_name)
            .bind(&alarm.recommended_action)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<AlarmRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM alarm_records WHERE id = $1");
        sqlx::query_as::<_, AlarmRecord>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List alarms newest first, optionally filtered.
    pub async fn list(
        pool: &PgPool,
        equipment_id: Option<&str>,
        status: Option<AlarmStatus>,
        limit: i64,
    ) -> Result<Vec<AlarmRecord>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM alarm_records
             WHERE ($1::TEXT IS NULL OR equipment_id = $1)
               AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY triggered_at DESC, id DESC
             LIMIT $3"
        );
        sqlx::query_as::<_, AlarmRecord>(&query)
            .bind(equipment_id)
            .bind(status.map(AlarmStatus::as_str))
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Record an operator transition.
    ///
    /// The caller validates the transition; this only writes it. The
    /// `expected` status guards against a concurrent transition, in which
    /// case `None` is returned.
    pub async fn update_status(
        pool: &PgPool,
        id: DbId,
        expected: AlarmStatus,
        next: AlarmStatus,
        handler: &str,
        handle_note: Option<&str>,
    ) -> Result<Option<AlarmRecord>, sqlx::Error> {
        let query = format!(
            "UPDATE alarm_records
             SET status = $3, handler = $4, handled_at = NOW(),
                 handle_note = COALESCE($5, handle_note), updated_at = NOW()
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AlarmRecord>(&query)
            .bind(id)
            .bind(expected.as_str())
            .bind(next.as_str())
            .bind(handler)
            .bind(handle_note)
            .fetch_optional(pool)
            .await
    }

    /// Alarm counts per severity for one device since `since`.
    pub async fn severity_counts(
        pool: &PgPool,
        equipment_id: &str,
        since: Timestamp,
    ) -> Result<Vec<SeverityCount>, sqlx::Error> {
        sqlx::query_as::<_, SeverityCount>(
            "SELECT severity, COUNT(*) AS count FROM alarm_records
             WHERE equipment_id = $1 AND triggered_at >= $2
             GROUP BY severity
             ORDER BY severity",
        )
        .bind(equipment_id)
        .bind(since)
        .fetch_all(pool)
        .await
    }
}
