//! Repository for the `readings` table (append-only time-series).

use sqlx::{PgExecutor, PgPool};
use shipwatch_core::reading::ReadingSource;
use shipwatch_core::types::{DbId, Timestamp};

use crate::models::reading::{NewReading, Reading};

/// Column list for `readings` SELECT / RETURNING clauses.
const COLUMNS: &str = "\
    id, equipment_id, recorded_at, metric_type, monitoring_point, \
    value, unit, quality, source, import_record_id, created_at";

/// Provides query operations for readings.
pub struct ReadingRepo;

impl ReadingRepo {
    /// Insert one reading on any executor (pool, connection, or transaction).
    ///
    /// Returns `None` when an identical (equipment, metric, point, instant)
    /// row already exists; the row is skipped, not duplicated.
    pub async fn insert<'e, E>(
        executor: E,
        reading: &NewReading,
        source: ReadingSource,
        import_record_id: Option<DbId>,
    ) -> Result<Option<Reading>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO readings
                (equipment_id, recorded_at, metric_type, monitoring_point,
                 value, unit, quality, source, import_record_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT DO NOTHING
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Reading>(&query)
            .bind(&reading.equipment_id)
            .bind(reading.recorded_at)
            .bind(&reading.metric_type)
            .bind(&reading.monitoring_point)
            .bind(reading.value)
            .bind(&reading.unit)
            .bind(&reading.quality)
            .bind(source.as_str())
            .bind(import_record_id)
            .fetch_optional(executor)
            .await
    }

    /// Readings for one piece of equipment since `since`, newest first.
    pub async fn list_for_equipment(
        pool: &PgPool,
        equipment_id: &str,
        since: Timestamp,
        limit: i64,
    ) -> Result<Vec<Reading>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM readings
             WHERE equipment_id = $1 AND recorded_at >= $2
             ORDER BY recorded_at DESC
             LIMIT $3"
        );
        sqlx::query_as::<_, Reading>(&query)
            .bind(equipment_id)
            .bind(since)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
