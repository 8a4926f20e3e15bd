use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use shipwatch_core::error::CoreError;
use shipwatch_core::types::DbId;
use shipwatch_db::repositories::ImportRecordRepo;
use shipwatch_pipeline::ImportRequest;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireOperator;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/imports
///
/// Run a batch import to completion. Partial failures are reported in the
/// result body; only an abandoned import is an error response.
pub async fn create_import(
    RequireOperator(user): RequireOperator,
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> AppResult<impl IntoResponse> {
    let result = state.ingestion.import(request, Some(user.user_id)).await?;
    Ok(Json(DataResponse { data: result }))
}

/// GET /api/v1/imports/{id}
pub async fn get_import(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(import_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let record = ImportRecordRepo::find_by_id(&state.pool, import_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ImportRecord",
            id: import_id,
        }))?;
    Ok(Json(DataResponse { data: record }))
}
