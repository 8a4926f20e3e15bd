use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Liveness plus a glance at realtime delivery.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when PostgreSQL is unreachable. Alarms cannot be
    /// persisted while degraded.
    pub status: &'static str,
    pub version: &'static str,
    pub db_healthy: bool,
    /// Open dashboard sockets.
    pub connections: usize,
    /// Offline users with alarm notifications waiting for replay.
    pub offline_buffers: usize,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = shipwatch_db::health_check(&state.pool).await.is_ok();
    let connections = state.registry.connection_count().await;
    let offline_buffers = state.registry.buffered_user_count().await;

    let status = if db_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        connections,
        offline_buffers,
    })
}

/// Mounted at the root, outside `/api/v1` and its authentication.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
