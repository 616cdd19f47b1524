//! Handler functions for user administration API endpoints.
//!
//! These functions process requests for user data, interact with the
//! user service, and return user-specific information.

use crate::api::common::{ApiResponse, PaginationFilter, PaginationMeta, pagination_params};
use crate::app::AppState;
use crate::auth::models::UserInfo;
use crate::auth::permissions::{self, ensure_permission};
use crate::errors::{ServiceError, ServiceResult};
use crate::services::user_service::UserService;
use crate::utils::jwt::Claims;
use axum::extract::{Extension, Json, Path, Query, rejection::QueryRejection};

#[axum::debug_handler]
pub async fn list_users(
    Extension(state): Extension<AppState>,
    Extension(claims): Extension<Claims>,
    params: Result<Query<PaginationFilter>, QueryRejection>,
) -> Result<Json<ApiResponse<Vec<UserInfo>>>, ServiceError> {
    ensure_permission(&claims, permissions::USERS_READ)?;
    let filter = pagination_params(params)?;

    let (users, total) = UserService::new(&state.pool, state.config.bcrypt_cost)
        .list_users(&filter)
        .await?;
    let users: Vec<UserInfo> = users.iter().map(UserInfo::from).collect();

    Ok(Json(ApiResponse::paginated(
        users,
        PaginationMeta::from_filter(&filter, total),
        "Users retrieved successfully",
    )))
}

/// Retrieves a user by its ID.
#[axum::debug_handler]
pub async fn get_user_by_id(
    Extension(state): Extension<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserInfo>>, ServiceError> {
    ensure_permission(&claims, permissions::USERS_READ)?;

    tracing::info!("Getting user by ID: {} for user: {}", id, claims.sub);

    let user = UserService::new(&state.pool, state.config.bcrypt_cost)
        .get_user_required(&id)
        .await?;

    Ok(Json(ApiResponse::success(
        UserInfo::from(&user),
        "User retrieved successfully",
    )))
}

async fn change_activation(
    state: &AppState,
    claims: &Claims,
    id: &str,
    is_active: bool,
) -> ServiceResult<UserInfo> {
    ensure_permission(claims, permissions::USERS_WRITE)?;

    let user = UserService::new(&state.pool, state.config.bcrypt_cost)
        .set_active(claims.user_id(), id, is_active)
        .await?;

    Ok(UserInfo::from(&user))
}

#[axum::debug_handler]
pub async fn activate_user(
    Extension(state): Extension<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserInfo>>, ServiceError> {
    let user = change_activation(&state, &claims, &id, true).await?;
    Ok(Json(ApiResponse::success(user, "User activated successfully")))
}

#[axum::debug_handler]
pub async fn deactivate_user(
    Extension(state): Extension<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UserInfo>>, ServiceError> {
    let user = change_activation(&state, &claims, &id, false).await?;
    Ok(Json(ApiResponse::success(user, "User deactivated successfully")))
}
