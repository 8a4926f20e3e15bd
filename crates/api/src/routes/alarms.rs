use axum::routing::{get, patch};
use axum::Router;

use crate::handlers::alarms;
use crate::state::AppState;

/// Alarm routes mounted at `/alarms`.
///
/// ```text
/// GET    /              -> list_alarms
/// GET    /{id}          -> get_alarm
/// PATCH  /{id}/status   -> update_alarm_status (operator or administrator)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(alarms::list_alarms))
        .route("/{id}", get(alarms::get_alarm))
        .route("/{id}/status", patch(alarms::update_alarm_status))
}
