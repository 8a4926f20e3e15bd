//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose roles do not
//! meet the minimum requirement.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use shipwatch_core::error::CoreError;
use shipwatch_core::roles::{ROLE_ADMINISTRATOR, ROLE_OPERATOR};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `administrator` role. Rejects with 403 Forbidden otherwise.
///
/// ```ignore
/// async fn admin_only(RequireAdministrator(user): RequireAdministrator) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireAdministrator(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdministrator {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.has_any_role(&[ROLE_ADMINISTRATOR]) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Administrator role required".into(),
            )));
        }
        Ok(RequireAdministrator(user))
    }
}

/// Requires `operator` or `administrator`. Rejects with 403 Forbidden otherwise.
pub struct RequireOperator(pub AuthUser);

impl FromRequestParts<AppState> for RequireOperator {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.has_any_role(&[ROLE_ADMINISTRATOR, ROLE_OPERATOR]) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Operator or Administrator role required".into(),
            )));
        }
        Ok(RequireOperator(user))
    }
}
