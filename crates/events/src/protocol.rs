//! Event wire protocol.
//!
//! Every outbound message is an [`Envelope`] serialized as a JSON text
//! frame. Inbound frames are parsed into [`ClientMessage`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shipwatch_core::types::{DbId, Timestamp};
use shipwatch_db::models::alarm_record::{AlarmRecord, SeverityCount};

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// Single alarm created or updated.
pub const EVENT_ALARM_PUSH: &str = "alarm:push";
/// Aggregated alarms raised by one bulk import.
pub const EVENT_ALARM_BATCH: &str = "alarm:batch";
/// Equipment-scoped alarm counts.
pub const EVENT_ALARM_TREND: &str = "alarm:trend";
/// A user opened their first connection (administrator room only).
pub const EVENT_USER_ONLINE: &str = "user:online";
/// A user closed their last connection (administrator room only).
pub const EVENT_USER_OFFLINE: &str = "user:offline";
/// Reply to a client liveness ping.
pub const EVENT_PONG: &str = "pong";

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Outbound message wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    pub data: serde_json::Value,
    pub timestamp: Timestamp,
    /// Set on messages replayed from the offline buffer.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub replayed: bool,
}

impl Envelope {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
            timestamp: Utc::now(),
            replayed: false,
        }
    }

    /// Mark the envelope as delivered from the offline buffer.
    pub fn into_replayed(mut self) -> Self {
        self.replayed = true;
        self
    }

    /// Serialize to the JSON text sent on the wire.
    pub fn to_text(&self) -> String {
        // Envelope holds only JSON-native values, so serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Full alarm payload for `alarm:push`, including the business context
/// copied from the rule and, once handled, the operator's handling details.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmPayload {
    pub id: DbId,
    pub equipment_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_code: Option<String>,
    pub threshold_id: Option<DbId>,
    pub abnormal_metric_type: String,
    pub abnormal_value: f64,
    pub threshold_range: String,
    pub triggered_at: Timestamp,
    pub severity: String,
    pub status: String,
    pub monitoring_point: Option<String>,
    pub fault_name: Option<String>,
    pub recommended_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handled_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle_note: Option<String>,
}

impl AlarmPayload {
    pub fn from_record(alarm: &AlarmRecord, device_code: Option<String>) -> Self {
        Self {
            id: alarm.id,
            equipment_id: alarm.equipment_id.clone(),
            device_code,
            threshold_id: alarm.threshold_id,
            abnormal_metric_type: alarm.abnormal_metric_type.clone(),
            abnormal_value: alarm.abnormal_value,
            threshold_range: alarm.threshold_range.clone(),
            triggered_at: alarm.triggered_at,
            severity: alarm.severity.clone(),
            status: alarm.status.clone(),
            monitoring_point: alarm.monitoring_point.clone(),
            fault_name: alarm.fault_name.clone(),
            recommended_action: alarm.recommended_action.clone(),
            handler: alarm.handler.clone(),
            handled_at: alarm.handled_at,
            handle_note: alarm.handle_note.clone(),
        }
    }
}

/// Payload of `alarm:batch`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlarmBatchPayload {
    pub alarms: Vec<AlarmPayload>,
    pub count: usize,
}

impl AlarmBatchPayload {
    pub fn new(alarms: Vec<AlarmPayload>) -> Self {
        let count = alarms.len();
        Self { alarms, count }
    }
}

/// Payload of `alarm:trend`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPayload {
    pub equipment_id: String,
    pub since: Timestamp,
    pub counts: Vec<SeverityTally>,
    pub total: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityTally {
    pub severity: String,
    pub count: i64,
}

impl TrendPayload {
    pub fn new(equipment_id: impl Into<String>, since: Timestamp, counts: Vec<SeverityCount>) -> Self {
        let counts: Vec<SeverityTally> = counts
            .into_iter()
            .map(|c| SeverityTally {
                severity: c.severity,
                count: c.count,
            })
            .collect();
        let total = counts.iter().map(|c| c.count).sum();
        Self {
            equipment_id: equipment_id.into(),
            since,
            counts,
            total,
        }
    }
}

/// Payload of `user:online` / `user:offline`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePayload {
    pub user_id: DbId,
    pub username: String,
    pub at: Timestamp,
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Messages a client may send over its connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Subscribe {
        #[serde(rename = "equipmentId")]
        equipment_id: String,
    },
    Unsubscribe {
        #[serde(rename = "equipmentId")]
        equipment_id: String,
    },
    Ping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_client_messages() {
        let sub: ClientMessage =
            serde_json::from_str(r#"{"type":"subscribe","equipmentId":"E1"}"#).unwrap();
        assert_eq!(
            sub,
            ClientMessage::Subscribe {
                equipment_id: "E1".into()
            }
        );

        let ping: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(ping, ClientMessage::Ping);

        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"dance"}"#).is_err());
    }

    #[test]
    fn replayed_flag_only_serialized_when_set() {
        let live = Envelope::new(EVENT_ALARM_PUSH, serde_json::json!({"id": 1}));
        let json: serde_json::Value = serde_json::from_str(&live.to_text()).unwrap();
        assert_eq!(json["event"], "alarm:push");
        assert!(json.get("replayed").is_none());

        let replayed = live.into_replayed();
        let json: serde_json::Value = serde_json::from_str(&replayed.to_text()).unwrap();
        assert_eq!(json["replayed"], true);
    }

    #[test]
    fn batch_counts_alarms() {
        let batch = AlarmBatchPayload::new(Vec::new());
        assert_eq!(batch.count, 0);
    }

    #[test]
    fn trend_totals_counts() {
        let trend = TrendPayload::new(
            "E1",
            Utc::now(),
            vec![
                SeverityCount {
                    severity: "high".into(),
                    count: 2,
                },
                SeverityCount {
                    severity: "low".into(),
                    count: 5,
                },
            ],
        );
        assert_eq!(trend.total, 7);
        assert_eq!(trend.counts[0].severity, "high");
    }
}
