//! Repositories for the `equipment` and `monitoring_points` tables.

use sqlx::PgPool;

use crate::models::equipment::{Equipment, MonitoringPoint};

const EQUIPMENT_COLUMNS: &str = "id, device_code, name, created_at, updated_at";
const POINT_COLUMNS: &str = "id, equipment_id, point_name, metric_type, unit, created_at";

/// Read-only equipment lookups used by ingestion and the realtime layer.
pub struct EquipmentRepo;

impl EquipmentRepo {
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Equipment>, sqlx::Error> {
        let query = format!("SELECT {EQUIPMENT_COLUMNS} FROM equipment WHERE id = $1");
        sqlx::query_as::<_, Equipment>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_device_code(
        pool: &PgPool,
        device_code: &str,
    ) -> Result<Option<Equipment>, sqlx::Error> {
        let query = format!("SELECT {EQUIPMENT_COLUMNS} FROM equipment WHERE device_code = $1");
        sqlx::query_as::<_, Equipment>(&query)
            .bind(device_code)
            .fetch_optional(pool)
            .await
    }

    /// Return the subset of `ids` present in the table.
    pub async fn existing_ids(pool: &PgPool, ids: &[String]) -> Result<Vec<String>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_scalar::<_, String>("SELECT id FROM equipment WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(pool)
            .await
    }
}

/// Read-only monitoring-point catalog lookups.
pub struct MonitoringPointRepo;

impl MonitoringPointRepo {
    pub async fn find(
        pool: &PgPool,
        equipment_id: &str,
        point_name: &str,
    ) -> Result<Option<MonitoringPoint>, sqlx::Error> {
        let query = format!(
            "SELECT {POINT_COLUMNS} FROM monitoring_points
             WHERE equipment_id = $1 AND point_name = $2"
        );
        sqlx::query_as::<_, MonitoringPoint>(&query)
            .bind(equipment_id)
            .bind(point_name)
            .fetch_optional(pool)
            .await
    }

    /// Return the subset of `point_names` registered for `equipment_id`.
    pub async fn known_points(
        pool: &PgPool,
        equipment_id: &str,
        point_names: &[String],
    ) -> Result<Vec<String>, sqlx::Error> {
        if point_names.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_scalar::<_, String>(
            "SELECT point_name FROM monitoring_points
             WHERE equipment_id = $1 AND point_name = ANY($2)",
        )
        .bind(equipment_id)
        .bind(point_names)
        .fetch_all(pool)
        .await
    }
}
