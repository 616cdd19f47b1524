//! CSRF token issuing and double-submit validation.

use axum::http::Method;
use rand::{Rng, distributions::Alphanumeric};

/// Header carrying the CSRF token on mutating requests.
pub const CSRF_HEADER: &str = "x-csrf-token";

const TOKEN_LENGTH: usize = 32;

/// Generates a random alphanumeric CSRF token.
pub fn generate_csrf_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Methods that never change server state.
pub fn is_safe_method(method: &Method) -> bool {
    [Method::GET, Method::HEAD, Method::OPTIONS, Method::TRACE].contains(method)
}

/// Read-only requests always pass. Mutations need a non-empty header token
/// that exactly equals the cookie token.
pub fn validate(method: &Method, header_token: Option<&str>, cookie_token: Option<&str>) -> bool {
    if is_safe_method(method) {
        return true;
    }

    match (header_token, cookie_token) {
        (Some(header), Some(cookie)) => !header.is_empty() && header == cookie,
        _ => false,
    }
}
