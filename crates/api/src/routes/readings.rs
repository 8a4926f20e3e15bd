use axum::routing::get;
use axum::Router;

use crate::handlers::readings;
use crate::state::AppState;

/// Reading routes mounted at `/readings`.
///
/// ```text
/// GET    /    -> list_readings (?equipment_id=&hours=&limit=)
/// POST   /    -> ingest_reading (operator or administrator)
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(readings::list_readings).post(readings::ingest_reading))
}
