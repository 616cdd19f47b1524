//! Handler functions for authentication-related API endpoints.
//!
//! These functions process incoming HTTP requests for login, logout,
//! registration and the current-user lookup, and interact with
//! `auth::service` and `services::user_service` for the core logic.

use crate::api::common::{ApiResponse, json_body};
use crate::app::AppState;
use crate::auth::models::*;
use crate::auth::permissions::{self, ensure_permission};
use crate::auth::service::AuthService;
use crate::database::models::CreateNewUser;
use crate::errors::ServiceError;
use crate::services::user_service::UserService;
use crate::utils::cookies::{clear_session_cookies, csrf_cookie, session_cookie};
use crate::utils::jwt::Claims;
use axum::{
    extract::{Extension, Json, rejection::JsonRejection},
    http::{StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Json as ResponseJson, Response},
};

/// Handle user login request
#[axum::debug_handler]
pub async fn login(
    Extension(state): Extension<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let payload = json_body(payload)?;
    let outcome = AuthService::new(&state).login(payload).await?;

    let session = session_cookie(&outcome.session_token, &state.config)?;
    let csrf = csrf_cookie(&outcome.csrf_token, &state.config)?;

    let body = ApiResponse::success(
        LoginResponse {
            user: outcome.user,
            csrf_token: outcome.csrf_token,
            expires_in: outcome.expires_in,
        },
        "Login successful",
    );

    let mut response = ResponseJson(body).into_response();
    response.headers_mut().append(SET_COOKIE, session);
    response.headers_mut().append(SET_COOKIE, csrf);
    Ok(response)
}

/// Handle logout request by expiring both session cookies
#[axum::debug_handler]
pub async fn logout(
    Extension(state): Extension<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, ServiceError> {
    tracing::info!(user_id = %claims.user_id(), "User logged out");

    let mut response =
        ResponseJson(ApiResponse::success((), "Logged out successfully")).into_response();
    for cookie in clear_session_cookies(&state.config)? {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    Ok(response)
}

/// Get current user information from token
#[axum::debug_handler]
pub async fn me(
    Extension(state): Extension<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<ResponseJson<ApiResponse<UserInfo>>, ServiceError> {
    let user_service = UserService::new(&state.pool, state.config.bcrypt_cost);
    let user = user_service.get_user_required(claims.user_id()).await?;

    Ok(ResponseJson(ApiResponse::success(
        UserInfo::from(&user),
        "User retrieved successfully",
    )))
}

/// Register a new user (administrators only)
#[axum::debug_handler]
pub async fn register(
    Extension(state): Extension<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<CreateNewUser>, JsonRejection>,
) -> Result<(StatusCode, ResponseJson<ApiResponse<UserInfo>>), ServiceError> {
    ensure_permission(&claims, permissions::USERS_WRITE)?;
    let payload = json_body(payload)?;

    let user_service = UserService::new(&state.pool, state.config.bcrypt_cost);
    let user = user_service.create_user(payload).await?;

    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(
            UserInfo::from(&user),
            "User registered successfully",
        )),
    ))
}
