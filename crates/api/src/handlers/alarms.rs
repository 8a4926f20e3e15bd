use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use shipwatch_core::alarm::AlarmStatus;
use shipwatch_core::error::CoreError;
use shipwatch_core::types::DbId;
use shipwatch_db::models::alarm_record::UpdateAlarmStatus;
use shipwatch_db::repositories::AlarmRecordRepo;
use shipwatch_events::AlarmNotifier;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireOperator;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct AlarmListParams {
    pub equipment_id: Option<String>,
    pub status: Option<AlarmStatus>,
    pub limit: Option<i64>,
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound { entity: "Alarm", id })
}

/// GET /api/v1/alarms
///
/// Newest first. `limit` defaults to 100 and is capped at 500.
pub async fn list_alarms(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<AlarmListParams>,
) -> AppResult<impl IntoResponse> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);
    let alarms = AlarmRecordRepo::list(
        &state.pool,
        params.equipment_id.as_deref(),
        params.status,
        limit,
    )
    .await?;
    Ok(Json(DataResponse { data: alarms }))
}

/// GET /api/v1/alarms/{id}
pub async fn get_alarm(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(alarm_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let alarm = AlarmRecordRepo::find_by_id(&state.pool, alarm_id)
        .await?
        .ok_or_else(|| not_found(alarm_id))?;
    Ok(Json(DataResponse { data: alarm }))
}

/// PATCH /api/v1/alarms/{id}/status
///
/// Move an alarm along its lifecycle, record the acting user as handler,
/// and re-push the updated alarm to its rooms.
pub async fn update_alarm_status(
    RequireOperator(user): RequireOperator,
    State(state): State<AppState>,
    Path(alarm_id): Path<DbId>,
    Json(input): Json<UpdateAlarmStatus>,
) -> AppResult<impl IntoResponse> {
    let current = AlarmRecordRepo::find_by_id(&state.pool, alarm_id)
        .await?
        .ok_or_else(|| not_found(alarm_id))?;
    let from = current.status()?;
    from.ensure_transition(input.status)?;

    let updated = AlarmRecordRepo::update_status(
        &state.pool,
        alarm_id,
        from,
        input.status,
        &user.username,
        input.handle_note.as_deref(),
    )
    .await?
    .ok_or_else(|| {
        AppError::Core(CoreError::Conflict(format!(
            "Alarm {alarm_id} changed status concurrently"
        )))
    })?;

    tracing::info!(
        alarm_id,
        from = %from,
        to = %input.status,
        user_id = user.user_id,
        "Alarm status updated",
    );

    if let Err(e) = state.fanout.push_alarm(&updated).await {
        tracing::warn!(alarm_id, error = %e, "Failed to push updated alarm");
    }

    Ok(Json(DataResponse { data: updated }))
}
