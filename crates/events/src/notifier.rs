//! Seam between alarm producers and the realtime fanout.

use async_trait::async_trait;
use shipwatch_db::models::alarm_record::AlarmRecord;

use crate::protocol::TrendPayload;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Failed to serialize event payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Notification channel unavailable: {0}")]
    Unavailable(String),
}

/// Receives alarms after they are persisted.
///
/// Delivery is fire-and-forget from the producer's point of view: callers
/// log a returned error and carry on, since the alarm is already stored.
#[async_trait]
pub trait AlarmNotifier: Send + Sync {
    /// Push a single alarm (`alarm:push`).
    async fn push_alarm(&self, alarm: &AlarmRecord) -> Result<(), NotifyError>;

    /// Push every alarm raised by one bulk import as an aggregate
    /// (`alarm:batch`). Empty slices are a no-op.
    async fn push_batch(&self, alarms: &[AlarmRecord]) -> Result<(), NotifyError>;

    /// Push equipment-scoped alarm counts (`alarm:trend`).
    async fn push_trend(&self, trend: &TrendPayload) -> Result<(), NotifyError>;
}
