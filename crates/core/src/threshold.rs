//! Threshold rule evaluation primitives.
//!
//! Pure logic: the caller fetches candidate rules and hands the limits and
//! the observed value in. Evaluation is per reading; a rule's `duration` is
//! carried for display but never consulted here.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Upper/lower bounds of a threshold rule. At least one must be set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    pub upper: Option<f64>,
    pub lower: Option<f64>,
}

impl Limits {
    pub fn new(upper: Option<f64>, lower: Option<f64>) -> Self {
        Self { upper, lower }
    }

    /// True when `value` is strictly above the upper limit or strictly below
    /// the lower limit. A value equal to a limit is within range.
    pub fn is_violated_by(&self, value: f64) -> bool {
        let over = self.upper.is_some_and(|upper| value > upper);
        let under = self.lower.is_some_and(|lower| value < lower);
        over || under
    }

    /// Human readable range stored on the alarm record.
    ///
    /// `"> 700"` for an upper-only rule, `"< 10"` for lower-only, and
    /// `"10 ~ 700"` when both limits are set.
    pub fn describe(&self) -> String {
        match (self.lower, self.upper) {
            (Some(lower), Some(upper)) => format!("{lower} ~ {upper}"),
            (None, Some(upper)) => format!("> {upper}"),
            (Some(lower), None) => format!("< {lower}"),
            (None, None) => String::from("unbounded"),
        }
    }

    /// Enforce rule-authoring constraints.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.upper.is_none() && self.lower.is_none() {
            return Err(CoreError::Validation(
                "At least one of upper_limit or lower_limit must be set".into(),
            ));
        }
        for (name, limit) in [("upper_limit", self.upper), ("lower_limit", self.lower)] {
            if limit.is_some_and(|v| !v.is_finite()) {
                return Err(CoreError::Validation(format!("{name} must be a finite number")));
            }
        }
        if let (Some(lower), Some(upper)) = (self.lower, self.upper) {
            if lower >= upper {
                return Err(CoreError::Validation(format!(
                    "lower_limit ({lower}) must be less than upper_limit ({upper})"
                )));
            }
        }
        Ok(())
    }
}

/// Validate the informational sustained-violation duration of a rule.
pub fn validate_duration(duration_seconds: i32) -> Result<(), CoreError> {
    if duration_seconds < 0 {
        return Err(CoreError::Validation(format!(
            "duration_seconds must not be negative, got {duration_seconds}"
        )));
    }
    Ok(())
}

/// Monitoring-point matching between a rule and a reading.
///
/// Strict equality: a rule without a monitoring point only matches readings
/// without one, and a rule with a point only matches readings carrying that
/// exact point. `None` is never a wildcard.
pub fn monitoring_point_matches(rule_point: Option<&str>, reading_point: Option<&str>) -> bool {
    rule_point == reading_point
}
