//! Equipment and monitoring-point catalog rows.

use serde::Serialize;
use sqlx::FromRow;
use shipwatch_core::types::{DbId, Timestamp};

/// A row from the `equipment` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub id: String,
    pub device_code: String,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `monitoring_points` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringPoint {
    pub id: DbId,
    pub equipment_id: String,
    pub point_name: String,
    pub metric_type: String,
    pub unit: Option<String>,
    pub created_at: Timestamp,
}
