//! Handlers for threshold rule authoring.
//!
//! Reads are open to any authenticated user; writes require the
//! administrator role. Edits never touch alarms already raised.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use shipwatch_core::error::CoreError;
use shipwatch_core::types::DbId;
use shipwatch_db::models::threshold_rule::ThresholdRuleInput;
use shipwatch_db::repositories::ThresholdRuleRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdministrator;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RuleListParams {
    pub equipment_id: Option<String>,
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "ThresholdRule",
        id,
    })
}

/// GET /api/v1/thresholds
pub async fn list_rules(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<RuleListParams>,
) -> AppResult<impl IntoResponse> {
    let rules = ThresholdRuleRepo::list(&state.pool, params.equipment_id.as_deref()).await?;
    Ok(Json(DataResponse { data: rules }))
}

/// GET /api/v1/thresholds/{id}
pub async fn get_rule(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(rule_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let rule = ThresholdRuleRepo::find_by_id(&state.pool, rule_id)
        .await?
        .ok_or_else(|| not_found(rule_id))?;
    Ok(Json(DataResponse { data: rule }))
}

/// POST /api/v1/thresholds
pub async fn create_rule(
    RequireAdministrator(admin): RequireAdministrator,
    State(state): State<AppState>,
    Json(input): Json<ThresholdRuleInput>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let rule = ThresholdRuleRepo::create(&state.pool, &input, Some(admin.user_id)).await?;

    tracing::info!(
        rule_id = rule.id,
        equipment_id = %rule.equipment_id,
        metric_type = %rule.metric_type,
        user_id = admin.user_id,
        "Threshold rule created",
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: rule })))
}

/// PUT /api/v1/thresholds/{id}
///
/// Full replacement of the authored fields.
pub async fn update_rule(
    RequireAdministrator(admin): RequireAdministrator,
    State(state): State<AppState>,
    Path(rule_id): Path<DbId>,
    Json(input): Json<ThresholdRuleInput>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let rule = ThresholdRuleRepo::update(&state.pool, rule_id, &input, Some(admin.user_id))
        .await?
        .ok_or_else(|| not_found(rule_id))?;

    tracing::info!(rule_id, user_id = admin.user_id, "Threshold rule updated");

    Ok(Json(DataResponse { data: rule }))
}

/// DELETE /api/v1/thresholds/{id}
///
/// Soft delete. The rule stops matching immediately.
pub async fn delete_rule(
    RequireAdministrator(admin): RequireAdministrator,
    State(state): State<AppState>,
    Path(rule_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    if !ThresholdRuleRepo::soft_delete(&state.pool, rule_id, Some(admin.user_id)).await? {
        return Err(not_found(rule_id));
    }

    tracing::info!(rule_id, user_id = admin.user_id, "Threshold rule deleted");

    Ok(StatusCode::NO_CONTENT)
}
