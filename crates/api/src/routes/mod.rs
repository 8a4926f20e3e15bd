pub mod alarms;
pub mod health;
pub mod imports;
pub mod readings;
pub mod thresholds;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                                  WebSocket (token in query or Bearer header)
///
/// /thresholds                          list, create (create: administrator)
/// /thresholds/{id}                     get, update, soft-delete (writes: administrator)
///
/// /alarms                              list (?equipment_id=&status=&limit=)
/// /alarms/{id}                         get
/// /alarms/{id}/status                  transition (PATCH, operator or administrator)
///
/// /readings                            live ingest (POST), history (GET)
///
/// /imports                             batch import (POST, operator or administrator)
/// /imports/{id}                        import record
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/thresholds", thresholds::router())
        .nest("/alarms", alarms::router())
        .nest("/readings", readings::router())
        .nest("/imports", imports::router())
}
