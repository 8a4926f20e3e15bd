//! Threshold rule rows and authoring DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use shipwatch_core::alarm::Severity;
use shipwatch_core::error::CoreError;
use shipwatch_core::threshold::{validate_duration, Limits};
use shipwatch_core::types::{DbId, Timestamp};

pub const RULE_STATUS_ENABLED: &str = "enabled";
pub const RULE_STATUS_DISABLED: &str = "disabled";

/// A row from the `threshold_rules` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdRule {
    pub id: DbId,
    pub equipment_id: String,
    pub metric_type: String,
    pub monitoring_point: Option<String>,
    pub upper_limit: Option<f64>,
    pub lower_limit: Option<f64>,
    pub duration_seconds: i32,
    pub severity: String,
    pub status: String,
    pub fault_name: Option<String>,
    pub recommended_action: Option<String>,
    pub created_by: Option<DbId>,
    pub updated_by: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub deleted_at: Option<Timestamp>,
}

impl ThresholdRule {
    pub fn limits(&self) -> Limits {
        Limits::new(self.upper_limit, self.lower_limit)
    }

    pub fn severity(&self) -> Result<Severity, CoreError> {
        self.severity.parse()
    }

    pub fn is_enabled(&self) -> bool {
        self.status == RULE_STATUS_ENABLED && self.deleted_at.is_none()
    }
}

/// Body of a rule create or full update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdRuleInput {
    pub equipment_id: String,
    pub metric_type: String,
    pub monitoring_point: Option<String>,
    pub upper_limit: Option<f64>,
    pub lower_limit: Option<f64>,
    #[serde(default)]
    pub duration_seconds: i32,
    pub severity: Severity,
    #[serde(default = "default_rule_status")]
    pub status: String,
    pub fault_name: Option<String>,
    pub recommended_action: Option<String>,
}

fn default_rule_status() -> String {
    RULE_STATUS_ENABLED.to_string()
}

impl ThresholdRuleInput {
    /// Check authoring constraints before the row is written.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.equipment_id.trim().is_empty() || self.metric_type.trim().is_empty() {
            return Err(CoreError::Validation(
                "equipment_id and metric_type are required".into(),
            ));
        }
        if self.monitoring_point.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(CoreError::Validation(
                "monitoring_point must be omitted rather than blank".into(),
            ));
        }
        if self.status != RULE_STATUS_ENABLED && self.status != RULE_STATUS_DISABLED {
            return Err(CoreError::Validation(format!(
                "status must be '{RULE_STATUS_ENABLED}' or '{RULE_STATUS_DISABLED}'"
            )));
        }
        Limits::new(self.upper_limit, self.lower_limit).validate()?;
        validate_duration(self.duration_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ThresholdRuleInput {
        ThresholdRuleInput {
            equipment_id: "E1".into(),
            metric_type: "voltage".into(),
            monitoring_point: Some("total".into()),
            upper_limit: Some(700.0),
            lower_limit: None,
            duration_seconds: 0,
            severity: Severity::High,
            status: RULE_STATUS_ENABLED.into(),
            fault_name: None,
            recommended_action: None,
        }
    }

    #[test]
    fn valid_input_passes() {
        assert!(input().validate().is_ok());
    }

    #[test]
    fn blank_monitoring_point_is_rejected() {
        let mut i = input();
        i.monitoring_point = Some("  ".into());
        assert!(i.validate().is_err());
    }

    #[test]
    fn unknown_status_is_rejected() {
        let mut i = input();
        i.status = "paused".into();
        assert!(i.validate().is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let i: ThresholdRuleInput = serde_json::from_value(serde_json::json!({
            "equipmentId": "E1",
            "metricType": "voltage",
            "upperLimit": 700.0,
            "severity": "critical"
        }))
        .unwrap();
        assert_eq!(i.status, RULE_STATUS_ENABLED);
        assert_eq!(i.duration_seconds, 0);
        assert_eq!(i.severity, Severity::Critical);
        assert!(i.monitoring_point.is_none());
    }
}
