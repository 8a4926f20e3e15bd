//! Single-reading ingestion for the streaming sensor feed.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use shipwatch_core::equipment::{EquipmentLookup, MonitoringPointCatalog, PointVerdict};
use shipwatch_core::error::CoreError;
use shipwatch_core::reading::validate_reading_fields;
use shipwatch_db::models::alarm_record::AlarmRecord;
use shipwatch_db::models::reading::{NewReading, Reading};
use shipwatch_events::protocol::TrendPayload;
use shipwatch_events::{AlarmNotifier, EquipmentIdCache};

use crate::error::PipelineError;
use crate::evaluator::ThresholdEvaluator;
use crate::store::{AlarmStore, ReadingStore};

/// Window covered by the `alarm:trend` aggregate.
const TREND_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveOutcome {
    /// The stored reading, or `None` when it duplicated one already stored.
    pub reading: Option<Reading>,
    pub alarms: Vec<AlarmRecord>,
}

pub struct LiveIngestor {
    readings: Arc<dyn ReadingStore>,
    alarms: Arc<dyn AlarmStore>,
    equipment: Arc<dyn EquipmentLookup>,
    catalog: Arc<dyn MonitoringPointCatalog>,
    cache: Arc<EquipmentIdCache>,
    evaluator: Arc<ThresholdEvaluator>,
    notifier: Arc<dyn AlarmNotifier>,
}

impl LiveIngestor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        readings: Arc<dyn ReadingStore>,
        alarms: Arc<dyn AlarmStore>,
        equipment: Arc<dyn EquipmentLookup>,
        catalog: Arc<dyn MonitoringPointCatalog>,
        cache: Arc<EquipmentIdCache>,
        evaluator: Arc<ThresholdEvaluator>,
        notifier: Arc<dyn AlarmNotifier>,
    ) -> Self {
        Self {
            readings,
            alarms,
            equipment,
            catalog,
            cache,
            evaluator,
            notifier,
        }
    }

    /// Persist, evaluate and push one live reading.
    ///
    /// `equipment_id` may be an internal id or an external device code.
    /// Evaluation and notification are best-effort.
    pub async fn ingest(&self, mut reading: NewReading) -> Result<LiveOutcome, PipelineError> {
        validate_reading_fields(&reading.equipment_id, &reading.metric_type, reading.value)?;
        reading.equipment_id = self.resolve_equipment(&reading.equipment_id).await?;
        self.check_point(&reading).await;

        let Some(stored) = self.readings.insert_live(&reading).await? else {
            tracing::debug!(
                equipment_id = %reading.equipment_id,
                metric_type = %reading.metric_type,
                "Duplicate live reading skipped",
            );
            return Ok(LiveOutcome {
                reading: None,
                alarms: Vec::new(),
            });
        };

        let alarms = self.evaluator.evaluate(&stored).await;
        for alarm in &alarms {
            if let Err(e) = self.notifier.push_alarm(alarm).await {
                tracing::warn!(alarm_id = alarm.id, error = %e, "Failed to push alarm");
            }
        }
        if !alarms.is_empty() {
            self.push_trend(&stored.equipment_id).await;
        }

        Ok(LiveOutcome {
            reading: Some(stored),
            alarms,
        })
    }

    async fn resolve_equipment(&self, id_or_code: &str) -> Result<String, PipelineError> {
        let known = self.equipment.existing_ids(&[id_or_code.to_string()]).await?;
        if known.contains(id_or_code) {
            return Ok(id_or_code.to_string());
        }
        match self.cache.internal_id(id_or_code).await? {
            Some(internal_id) => Ok(internal_id),
            None => Err(CoreError::Validation(format!("Unknown equipment '{id_or_code}'")).into()),
        }
    }

    async fn check_point(&self, reading: &NewReading) {
        let Some(point) = reading.monitoring_point.as_deref() else {
            return;
        };
        match self
            .catalog
            .validate(&reading.equipment_id, point, &reading.metric_type)
            .await
        {
            Ok(PointVerdict::Ok) => {}
            Ok(PointVerdict::Reject(reason)) => {
                tracing::warn!(equipment_id = %reading.equipment_id, reason = %reason, "Monitoring point rejected");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Monitoring point catalog unavailable");
            }
        }
    }

    async fn push_trend(&self, equipment_id: &str) {
        let since = Utc::now() - Duration::hours(TREND_WINDOW_HOURS);
        let counts = match self.alarms.severity_counts(equipment_id, since).await {
            Ok(counts) => counts,
            Err(e) => {
                tracing::warn!(equipment_id, error = %e, "Failed to aggregate alarm trend");
                return;
            }
        };
        let trend = TrendPayload::new(equipment_id, since, counts);
        if let Err(e) = self.notifier.push_trend(&trend).await {
            tracing::warn!(equipment_id, error = %e, "Failed to push alarm trend");
        }
    }
}
