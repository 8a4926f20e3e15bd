use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::ws::registry::ConnectionRegistry;

/// Spawn a background task that pings every connection and expires stale
/// offline buffers on each tick, until `cancel` fires.
pub fn start_heartbeat(
    registry: Arc<ConnectionRegistry>,
    period: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("Heartbeat stopping");
                    break;
                }
                _ = interval.tick() => {
                    let count = registry.connection_count().await;
                    tracing::debug!(count, "WebSocket heartbeat ping");
                    registry.ping_all().await;
                    let pruned = registry.prune_buffers().await;
                    if pruned > 0 {
                        tracing::debug!(pruned, "Expired offline buffer events");
                    }
                }
            }
        }
    })
}
