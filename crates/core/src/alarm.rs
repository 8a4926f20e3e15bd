//! Alarm severity and lifecycle.
//!
//! Alarms are created `pending` and move forward only through operator
//! action. There are no automatic transitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Severity carried by a threshold rule and copied onto its alarms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// High and critical alarms are broadcast to the escalation role rooms
    /// in addition to the equipment room.
    pub fn is_escalated(self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(CoreError::Validation(format!("Unknown severity '{other}'"))),
        }
    }
}

/// Lifecycle status of an alarm record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmStatus {
    Pending,
    Processing,
    Resolved,
    Ignored,
}

impl AlarmStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Resolved => "resolved",
            Self::Ignored => "ignored",
        }
    }

    /// Resolved and ignored alarms are closed for good.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Ignored)
    }

    /// Whether an operator may move an alarm from `self` to `next`.
    pub fn can_transition_to(self, next: AlarmStatus) -> bool {
        match self {
            _ if self.is_terminal() => false,
            Self::Pending => next != Self::Pending,
            _ => next.is_terminal(),
        }
    }

    /// Validate a transition, returning a `Conflict` error naming both ends.
    pub fn ensure_transition(self, next: AlarmStatus) -> Result<(), CoreError> {
        if self.is_terminal() {
            Err(CoreError::Conflict(format!("Alarm is already {self}")))
        } else if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(CoreError::Conflict(format!(
                "Alarm cannot move from {self} to {next}"
            )))
        }
    }
}

impl fmt::Display for AlarmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlarmStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "resolved" => Ok(Self::Resolved),
            "ignored" => Ok(Self::Ignored),
            other => Err(CoreError::Validation(format!(
                "Unknown alarm status '{other}'"
            ))),
        }
    }
}
