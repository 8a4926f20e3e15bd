//! Time-series reading rows (append-only).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use shipwatch_core::types::{DbId, Timestamp};

/// A row from the `readings` table. Immutable once written.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub id: DbId,
    pub equipment_id: String,
    #[serde(rename = "timestamp")]
    pub recorded_at: Timestamp,
    pub metric_type: String,
    pub monitoring_point: Option<String>,
    pub value: f64,
    pub unit: Option<String>,
    pub quality: Option<String>,
    pub source: String,
    pub import_record_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// A reading that has not been persisted yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReading {
    pub equipment_id: String,
    #[serde(rename = "timestamp")]
    pub recorded_at: Timestamp,
    pub metric_type: String,
    pub monitoring_point: Option<String>,
    pub value: f64,
    pub unit: Option<String>,
    pub quality: Option<String>,
}
