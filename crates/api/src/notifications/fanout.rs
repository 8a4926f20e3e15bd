//! Room routing for alarm events.
//!
//! - Every alarm goes to `equipment:{id}`.
//! - High and critical alarms also go to the escalation role rooms.
//! - Import batches go to the escalation role rooms as one aggregate, and to
//!   each affected `equipment:{id}` room as that equipment's share. A
//!   connection in both gets only the aggregate.
//! - Trends go to the equipment room only.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use shipwatch_core::rooms::DeliveryTarget;
use shipwatch_core::roles::{ESCALATION_ROLES, ROLE_ADMINISTRATOR};
use shipwatch_db::models::alarm_record::AlarmRecord;
use shipwatch_events::protocol::{
    AlarmBatchPayload, AlarmPayload, PresencePayload, TrendPayload, EVENT_ALARM_BATCH,
    EVENT_ALARM_PUSH, EVENT_ALARM_TREND, EVENT_USER_OFFLINE, EVENT_USER_ONLINE,
};
use shipwatch_events::{AlarmNotifier, EquipmentIdCache, NotifyError};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::ws::registry::{ConnectionRegistry, DeliveryReport, PresenceChange};

pub struct NotificationFanout {
    registry: Arc<ConnectionRegistry>,
    cache: Arc<EquipmentIdCache>,
}

impl NotificationFanout {
    pub fn new(registry: Arc<ConnectionRegistry>, cache: Arc<EquipmentIdCache>) -> Self {
        Self { registry, cache }
    }

    /// Push a single alarm and report where it went.
    pub async fn deliver_alarm(&self, alarm: &AlarmRecord) -> Result<DeliveryReport, NotifyError> {
        let escalated = match alarm.severity() {
            Ok(severity) => severity.is_escalated(),
            Err(e) => {
                tracing::warn!(alarm_id = alarm.id, error = %e, "Alarm has unknown severity, not escalating");
                false
            }
        };

        let mut targets = vec![DeliveryTarget::Equipment(alarm.equipment_id.clone())];
        if escalated {
            targets.extend(ESCALATION_ROLES.iter().map(|r| DeliveryTarget::Role((*r).to_string())));
        }

        let payload = self.payload(alarm).await;
        let data = serde_json::to_value(&payload)?;
        let report = self.registry.deliver_all(&targets, EVENT_ALARM_PUSH, data).await;
        tracing::debug!(
            alarm_id = alarm.id,
            equipment_id = %alarm.equipment_id,
            escalated,
            delivered = report.delivered,
            "Alarm pushed",
        );
        Ok(report)
    }

    async fn payload(&self, alarm: &AlarmRecord) -> AlarmPayload {
        let device_code = match self.cache.external_code(&alarm.equipment_id).await {
            Ok(code) => code,
            Err(e) => {
                tracing::debug!(equipment_id = %alarm.equipment_id, error = %e, "Device code unavailable");
                None
            }
        };
        AlarmPayload::from_record(alarm, device_code)
    }

    /// Forward presence changes to the administrator room until the
    /// registry closes the channel or `cancel` fires.
    pub async fn run_presence(
        self: Arc<Self>,
        mut receiver: broadcast::Receiver<PresenceChange>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Presence forwarder stopping");
                    break;
                }
                received = receiver.recv() => match received {
                    Ok(change) => self.publish_presence(change).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Presence forwarder lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Presence channel closed, forwarder shutting down");
                        break;
                    }
                },
            }
        }
    }

    async fn publish_presence(&self, change: PresenceChange) {
        let (event, identity) = match change {
            PresenceChange::Online(identity) => (EVENT_USER_ONLINE, identity),
            PresenceChange::Offline(identity) => (EVENT_USER_OFFLINE, identity),
        };
        let payload = PresencePayload {
            user_id: identity.user_id,
            username: identity.username,
            at: chrono::Utc::now(),
        };
        match serde_json::to_value(&payload) {
            Ok(data) => {
                self.registry
                    .deliver(&DeliveryTarget::Role(ROLE_ADMINISTRATOR.to_string()), event, data)
                    .await;
            }
            Err(e) => tracing::warn!(error = %e, "Failed to encode presence event"),
        }
    }
}

#[async_trait]
impl AlarmNotifier for NotificationFanout {
    async fn push_alarm(&self, alarm: &AlarmRecord) -> Result<(), NotifyError> {
        self.deliver_alarm(alarm).await.map(|_| ())
    }

    async fn push_batch(&self, alarms: &[AlarmRecord]) -> Result<(), NotifyError> {
        if alarms.is_empty() {
            return Ok(());
        }

        let mut payloads = Vec::with_capacity(alarms.len());
        for alarm in alarms {
            payloads.push(self.payload(alarm).await);
        }

        let mut by_equipment: BTreeMap<&str, Vec<AlarmPayload>> = BTreeMap::new();
        for (alarm, payload) in alarms.iter().zip(&payloads) {
            by_equipment
                .entry(alarm.equipment_id.as_str())
                .or_default()
                .push(payload.clone());
        }

        let roles: Vec<DeliveryTarget> = ESCALATION_ROLES
            .iter()
            .map(|r| DeliveryTarget::Role((*r).to_string()))
            .collect();
        let data = serde_json::to_value(AlarmBatchPayload::new(payloads))?;
        let mut delivered = self
            .registry
            .deliver_all(&roles, EVENT_ALARM_BATCH, data)
            .await
            .delivered;

        for (equipment_id, share) in by_equipment {
            let data = serde_json::to_value(AlarmBatchPayload::new(share))?;
            let room = DeliveryTarget::Equipment(equipment_id.to_string());
            let report = self
                .registry
                .deliver_all_except(std::slice::from_ref(&room), &roles, EVENT_ALARM_BATCH, data)
                .await;
            delivered += report.delivered;
        }

        tracing::info!(count = alarms.len(), delivered, "Alarm batch pushed");
        Ok(())
    }

    async fn push_trend(&self, trend: &TrendPayload) -> Result<(), NotifyError> {
        let data = serde_json::to_value(trend)?;
        self.registry
            .deliver(
                &DeliveryTarget::Equipment(trend.equipment_id.clone()),
                EVENT_ALARM_TREND,
                data,
            )
            .await;
        Ok(())
    }
}
