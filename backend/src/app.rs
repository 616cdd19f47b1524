//! Application state and router assembly.
//!
//! Wires the request pipeline together: every route is rate limited, public
//! routes stop there, and protected routes additionally pass the CSRF check
//! and session token verification before their handler applies the
//! permission gate.

use crate::api;
use crate::api::common::{ApiResponse, internal_error_response};
use crate::auth;
use crate::auth::middleware::{csrf_protect, jwt_auth, rate_limit};
use crate::config::Config;
use crate::errors::ServiceResult;
use crate::services::rate_limiter::{RateLimitStore, RateLimiter};
use crate::services::user_service::hash_password;
use crate::utils::jwt::JwtUtils;
use axum::{
    Extension, Router, middleware,
    response::{Json, Response},
    routing::get,
};
use sqlx::SqlitePool;
use std::any::Any;
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

/// Shared handles passed to handlers and middleware through an `Extension`.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtUtils>,
    pub rate_limiter: Arc<RateLimiter>,
    /// Compared against when a login names an unknown user.
    pub dummy_hash: Arc<str>,
}

impl AppState {
    pub async fn new(
        config: Config,
        pool: SqlitePool,
        rate_limit_store: Arc<dyn RateLimitStore>,
    ) -> ServiceResult<Self> {
        let jwt = JwtUtils::new(&config);
        let rate_limiter = RateLimiter::from_config(&config, rate_limit_store);
        let dummy_hash =
            hash_password(crate::utils::csrf::generate_csrf_token(), config.bcrypt_cost).await?;

        Ok(AppState {
            pool,
            config: Arc::new(config),
            jwt: Arc::new(jwt),
            rate_limiter: Arc::new(rate_limiter),
            dummy_hash: Arc::from(dummy_hash),
        })
    }
}

/// Builds the full router with the authorization pipeline applied.
pub fn app_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/api/health", get(health_handler))
        .merge(auth::routes::public_auth_router());

    // Layers added last run first: CSRF is checked before the token.
    let protected = Router::new()
        .merge(auth::routes::session_router())
        .nest("/api/inventory", api::inventory::routes::inventory_router())
        .nest("/api/users", api::user::routes::user_router())
        .route_layer(middleware::from_fn(jwt_auth))
        .route_layer(middleware::from_fn(csrf_protect));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(middleware::from_fn(rate_limit))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}

async fn health_handler() -> Json<ApiResponse<serde_json::Value>> {
    Json(ApiResponse::success(
        serde_json::json!({
            "status": "ok",
            "service": "Ninu Factory Control",
            "version": env!("CARGO_PKG_VERSION"),
        }),
        "Service healthy",
    ))
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    tracing::error!(
        panic = %detail,
        backtrace = %std::backtrace::Backtrace::force_capture(),
        "Handler panicked"
    );
    internal_error_response()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::database::models::{CreateNewUser, User};
    use crate::database::test_pool;
    use crate::services::rate_limiter::InMemoryRateLimitStore;
    use crate::services::user_service::UserService;

    pub async fn test_state() -> AppState {
        test_state_with(Config::for_tests()).await
    }

    pub async fn test_state_with(config: Config) -> AppState {
        AppState::new(
            config,
            test_pool().await,
            Arc::new(InMemoryRateLimitStore::new()),
        )
        .await
        .unwrap()
    }

    pub async fn seed_user(state: &AppState, username: &str, role: &str, password: &str) -> User {
        UserService::new(&state.pool, state.config.bcrypt_cost)
            .create_user(CreateNewUser {
                username: username.to_string(),
                email: format!("{}@ninu.test", username),
                password: password.to_string(),
                role: role.to_string(),
                department: None,
                shift: None,
            })
            .await
            .unwrap()
    }
}
