//! Route definitions for threshold rules.

use axum::routing::get;
use axum::Router;

use crate::handlers::thresholds;
use crate::state::AppState;

/// Threshold rule routes mounted at `/thresholds`.
///
/// ```text
/// GET    /          -> list_rules
/// POST   /          -> create_rule (administrator)
/// GET    /{id}      -> get_rule
/// PUT    /{id}      -> update_rule (administrator)
/// DELETE /{id}      -> delete_rule (administrator)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(thresholds::list_rules).post(thresholds::create_rule))
        .route(
            "/{id}",
            get(thresholds::get_rule)
                .put(thresholds::update_rule)
                .delete(thresholds::delete_rule),
        )
}
