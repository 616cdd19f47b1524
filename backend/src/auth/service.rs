//! Core business logic for the authentication system.

use crate::app::AppState;
use crate::auth::models::*;
use crate::errors::{ServiceError, ServiceResult};
use crate::services::user_service::UserService;
use crate::utils::csrf::generate_csrf_token;
use validator::Validate;

/// Authentication service issuing session tokens and CSRF tokens
pub struct AuthService<'a> {
    state: &'a AppState,
    user_service: UserService<'a>,
}

impl<'a> AuthService<'a> {
    pub fn new(state: &'a AppState) -> Self {
        let user_service = UserService::new(&state.pool, state.config.bcrypt_cost);
        AuthService {
            state,
            user_service,
        }
    }

    /// Authenticate user and mint a session token plus CSRF token
    pub async fn login(&self, login_request: LoginRequest) -> ServiceResult<LoginOutcome> {
        if let Err(validation_errors) = login_request.validate() {
            return Err(ServiceError::from_validation_errors(&validation_errors));
        }

        let user = self
            .user_service
            .authenticate_user(
                &login_request.username,
                &login_request.password,
                &self.state.dummy_hash,
            )
            .await?;

        let session_token = self.state.jwt.generate_token(&user)?;
        let csrf_token = generate_csrf_token();

        tracing::info!(user_id = %user.id, role = %user.role, "User logged in");

        Ok(LoginOutcome {
            user: UserInfo::from(&user),
            session_token,
            csrf_token,
            expires_in: self.state.jwt.ttl_seconds(),
        })
    }
}
