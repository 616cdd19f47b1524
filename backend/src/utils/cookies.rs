//! `Set-Cookie` construction and `Cookie` header parsing for the session pair.

use axum::http::{HeaderMap, HeaderValue, header::COOKIE};

use crate::config::Config;
use crate::errors::{ServiceError, ServiceResult};

pub const SESSION_COOKIE: &str = "auth-token";
pub const CSRF_COOKIE: &str = "csrf-token";

fn build_cookie(
    name: &str,
    value: &str,
    max_age: u64,
    http_only: bool,
    secure: bool,
) -> ServiceResult<HeaderValue> {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; SameSite=Strict",
        name, value, max_age
    );
    if http_only {
        cookie.push_str("; HttpOnly");
    }
    if secure {
        cookie.push_str("; Secure");
    }

    HeaderValue::from_str(&cookie)
        .map_err(|e| ServiceError::internal_error(format!("Invalid cookie value: {}", e)))
}

/// The session token cookie; never readable by client script.
pub fn session_cookie(token: &str, config: &Config) -> ServiceResult<HeaderValue> {
    build_cookie(
        SESSION_COOKIE,
        token,
        config.session_ttl_seconds,
        true,
        config.production,
    )
}

/// The CSRF cookie; client script reads it and echoes it in the CSRF header.
pub fn csrf_cookie(token: &str, config: &Config) -> ServiceResult<HeaderValue> {
    build_cookie(
        CSRF_COOKIE,
        token,
        config.session_ttl_seconds,
        false,
        config.production,
    )
}

/// Expires both session cookies.
pub fn clear_session_cookies(config: &Config) -> ServiceResult<[HeaderValue; 2]> {
    Ok([
        build_cookie(SESSION_COOKIE, "", 0, true, config.production)?,
        build_cookie(CSRF_COOKIE, "", 0, false, config.production)?,
    ])
}

/// Reads a cookie value from every `Cookie` header on the request.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_cookie_attributes() {
        let config = Config::for_tests();
        let cookie = session_cookie("tok", &config).unwrap();
        let cookie = cookie.to_str().unwrap();

        assert!(cookie.starts_with("auth-token=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=28800"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_csrf_cookie_readable_and_secure_in_production() {
        let mut config = Config::for_tests();
        config.production = true;
        let cookie = csrf_cookie("xyz", &config).unwrap();
        let cookie = cookie.to_str().unwrap();

        assert!(cookie.starts_with("csrf-token=xyz;"));
        assert!(!cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
    }

    #[test]
    fn test_clear_cookies_expire_immediately() {
        let [session, csrf] = clear_session_cookies(&Config::for_tests()).unwrap();
        assert!(session.to_str().unwrap().starts_with("auth-token=;"));
        assert!(csrf.to_str().unwrap().contains("Max-Age=0"));
    }

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; auth-token=abc.def.ghi; csrf-token=K9"),
        );
        headers.append(COOKIE, HeaderValue::from_static("other=1"));

        assert_eq!(read_cookie(&headers, SESSION_COOKIE).as_deref(), Some("abc.def.ghi"));
        assert_eq!(read_cookie(&headers, CSRF_COOKIE).as_deref(), Some("K9"));
        assert_eq!(read_cookie(&headers, "other").as_deref(), Some("1"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }
}
