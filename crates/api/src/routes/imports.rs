use axum::routing::{get, post};
use axum::Router;

use crate::handlers::imports;
use crate::state::AppState;

/// Batch import routes mounted at `/imports`.
///
/// ```text
/// POST   /        -> create_import (operator or administrator)
/// GET    /{id}    -> get_import
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(imports::create_import))
        .route("/{id}", get(imports::get_import))
}
