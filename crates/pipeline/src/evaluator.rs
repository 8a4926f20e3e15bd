//! Threshold evaluation of one reading.

use std::sync::Arc;

use shipwatch_core::error::CoreError;
use shipwatch_core::threshold::monitoring_point_matches;
use shipwatch_db::models::alarm_record::{AlarmRecord, NewAlarmRecord};
use shipwatch_db::models::reading::Reading;
use shipwatch_db::models::threshold_rule::ThresholdRule;

use crate::error::EvaluationError;
use crate::store::{AlarmStore, RuleStore};

/// Result of evaluating one reading.
#[derive(Debug, Default)]
pub struct Evaluation {
    /// Alarms persisted for this reading.
    pub alarms: Vec<AlarmRecord>,
    /// Rules that could not be evaluated or whose alarm was not stored.
    pub errors: Vec<EvaluationError>,
}

impl Evaluation {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Matches a reading against its rules and persists one alarm per
/// violated rule.
pub struct ThresholdEvaluator {
    rules: Arc<dyn RuleStore>,
    alarms: Arc<dyn AlarmStore>,
}

impl ThresholdEvaluator {
    pub fn new(rules: Arc<dyn RuleStore>, alarms: Arc<dyn AlarmStore>) -> Self {
        Self { rules, alarms }
    }

    /// Evaluate and persist rule by rule.
    ///
    /// A failing rule does not stop the ones after it, and alarms already
    /// persisted are always returned alongside the failures. A failed rule
    /// lookup yields no alarms and a single error.
    pub async fn try_evaluate(&self, reading: &Reading) -> Evaluation {
        let mut outcome = Evaluation::default();
        let rules = match self
            .rules
            .find_enabled_matching(
                &reading.equipment_id,
                &reading.metric_type,
                reading.monitoring_point.as_deref(),
            )
            .await
        {
            Ok(rules) => rules,
            Err(e) => {
                outcome.errors.push(e.into());
                return outcome;
            }
        };

        for rule in rules.iter().filter(|rule| applies_to(rule, reading)) {
            if !rule.limits().is_violated_by(reading.value) {
                continue;
            }
            let alarm = match build_alarm(rule, reading) {
                Ok(alarm) => alarm,
                Err(source) => {
                    outcome.errors.push(EvaluationError::InvalidRule {
                        rule_id: rule.id,
                        source,
                    });
                    continue;
                }
            };
            match self.alarms.create(&alarm).await {
                Ok(record) => outcome.alarms.push(record),
                Err(e) => outcome.errors.push(e.into()),
            }
        }
        outcome
    }

    /// Best-effort evaluation: failures are logged, persisted alarms are
    /// returned.
    pub async fn evaluate(&self, reading: &Reading) -> Vec<AlarmRecord> {
        let outcome = self.try_evaluate(reading).await;
        for e in &outcome.errors {
            tracing::error!(
                error = %e,
                reading_id = reading.id,
                equipment_id = %reading.equipment_id,
                "Threshold evaluation failed",
            );
        }
        outcome.alarms
    }
}

/// The strict matching predicate. Stores filter on it too.
fn applies_to(rule: &ThresholdRule, reading: &Reading) -> bool {
    rule.is_enabled()
        && rule.equipment_id == reading.equipment_id
        && rule.metric_type == reading.metric_type
        && monitoring_point_matches(rule.monitoring_point.as_deref(), reading.monitoring_point.as_deref())
}

/// Build the alarm for a violated rule.
///
/// Business context is copied from the rule as it is now; `triggered_at` is
/// the reading's own timestamp so backfilled readings raise
/// historically-dated alarms.
pub fn build_alarm(rule: &ThresholdRule, reading: &Reading) -> Result<NewAlarmRecord, CoreError> {
    Ok(NewAlarmRecord {
        equipment_id: reading.equipment_id.clone(),
        threshold_id: rule.id,
        abnormal_metric_type: reading.metric_type.clone(),
        abnormal_value: reading.value,
        threshold_range: rule.limits().describe(),
        triggered_at: reading.recorded_at,
        severity: rule.severity()?,
        monitoring_point: rule.monitoring_point.clone(),
        fault_name: rule.fault_name.clone(),
        recommended_action: rule.recommended_action.clone(),
    })
}
