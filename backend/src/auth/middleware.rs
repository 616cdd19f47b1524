//! Request pipeline middleware: rate limiting, CSRF protection and session
//! token verification.
//!
//! Order on a protected route is `rate_limit → csrf_protect → jwt_auth →
//! handler`; the handler then applies the permission gate. Public routes only
//! pass through `rate_limit`.

use crate::app::AppState;
use crate::errors::ServiceError;
use crate::services::rate_limiter::RateLimitDecision;
use crate::utils::cookies::{CSRF_COOKIE, SESSION_COOKIE, clear_session_cookies, read_cookie};
use crate::utils::csrf::{self, CSRF_HEADER};
use axum::{
    Extension,
    extract::{ConnectInfo, Request},
    http::{
        HeaderMap,
        header::{AUTHORIZATION, SET_COOKIE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;

/// Identifies the calling client for rate limiting.
///
/// With `trust_proxy_headers` the first `X-Forwarded-For` hop wins, then
/// `X-Real-IP`. Otherwise, and as a fallback, the socket peer address is used.
pub fn client_key(request: &Request, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers {
        if let Some(forwarded) = forwarded_client(request.headers()) {
            return forwarded;
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if let Some(forwarded) = forwarded {
        return Some(forwarded.to_string());
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    real_ip.map(str::to_string)
}

/// Fixed-window rate limiting for every route
pub async fn rate_limit(
    Extension(state): Extension<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let client = client_key(&request, state.config.trust_proxy_headers);
    let path = request.uri().path().to_string();

    let decision = state.rate_limiter.check(&client, &path).await?;
    if let RateLimitDecision::Limited { retry_after_secs } = decision {
        tracing::warn!(client = %client, path = %path, retry_after_secs, "Rate limit exceeded");
    }
    decision.into_result()?;

    Ok(next.run(request).await)
}

/// Double-submit CSRF check for mutating requests
pub async fn csrf_protect(request: Request, next: Next) -> Result<Response, ServiceError> {
    let cookie_token = read_cookie(request.headers(), CSRF_COOKIE);
    let header_token = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|value| value.to_str().ok());

    if !csrf::validate(request.method(), header_token, cookie_token.as_deref()) {
        tracing::warn!(
            method = %request.method(),
            path = %request.uri().path(),
            "CSRF token mismatch"
        );
        return Err(ServiceError::CsrfMismatch);
    }

    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

/// Session token authentication middleware
///
/// Reads the `auth-token` cookie, falling back to an `Authorization: Bearer`
/// header. Any failure yields the same 401 and clears the session cookies.
pub async fn jwt_auth(
    Extension(state): Extension<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let token = read_cookie(request.headers(), SESSION_COOKIE)
        .filter(|token| !token.is_empty())
        .or_else(|| bearer_token(request.headers()));

    let verified = match token {
        Some(token) => state.jwt.validate_token(&token),
        None => Err(ServiceError::invalid_token("missing session token")),
    };

    match verified {
        Ok(claims) => {
            // Add claims to request extensions for use in handlers
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        Err(error) => {
            let mut response = error.into_response();
            for cookie in clear_session_cookies(&state.config)? {
                response.headers_mut().append(SET_COOKIE, cookie);
            }
            Ok(response)
        }
    }
}
