use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use shipwatch_core::error::CoreError;
use shipwatch_db::models::reading::NewReading;
use shipwatch_db::repositories::ReadingRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireOperator;
use crate::response::DataResponse;
use crate::state::AppState;

const DEFAULT_HISTORY_HOURS: i64 = 24;
const MAX_HISTORY_HOURS: i64 = 24 * 366;
const DEFAULT_HISTORY_LIMIT: i64 = 1000;
const MAX_HISTORY_LIMIT: i64 = 10_000;

#[derive(Debug, Deserialize)]
pub struct ReadingHistoryParams {
    pub equipment_id: String,
    pub hours: Option<i64>,
    pub limit: Option<i64>,
}

/// POST /api/v1/readings
///
/// Ingest one reading from the live feed. `equipmentId` may be an internal
/// id or an external device code. Returns 201 with the stored reading and
/// any alarms it raised, or 200 with `reading: null` for a duplicate.
pub async fn ingest_reading(
    RequireOperator(user): RequireOperator,
    State(state): State<AppState>,
    Json(reading): Json<NewReading>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.live.ingest(reading).await?;

    let status = if outcome.reading.is_some() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    tracing::debug!(
        user_id = user.user_id,
        stored = outcome.reading.is_some(),
        alarms = outcome.alarms.len(),
        "Live reading ingested",
    );

    Ok((status, Json(DataResponse { data: outcome })))
}

/// GET /api/v1/readings?equipment_id=&hours=&limit=
///
/// Recent history for one device, newest first. `hours` must lie in
/// `1..=8784` (one leap year).
pub async fn list_readings(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<ReadingHistoryParams>,
) -> AppResult<impl IntoResponse> {
    let hours = params.hours.unwrap_or(DEFAULT_HISTORY_HOURS);
    if !(1..=MAX_HISTORY_HOURS).contains(&hours) {
        return Err(CoreError::Validation(format!(
            "hours must be between 1 and {MAX_HISTORY_HOURS}, got {hours}"
        ))
        .into());
    }
    let equipment_id = state.equipment_cache.normalize(&params.equipment_id).await;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let since = chrono::Utc::now() - chrono::Duration::hours(hours);

    let readings = ReadingRepo::list_for_equipment(&state.pool, &equipment_id, since, limit).await?;
    Ok(Json(DataResponse { data: readings }))
}
