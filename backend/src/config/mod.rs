//! Central module for application-wide configuration settings.
//!
//! This module handles loading and managing configuration parameters such as
//! the database URL, server port, session signing secret, cookie security
//! mode and rate-limit ceilings.

use anyhow::{Context, Result, bail};
use std::env;
use std::fmt::Display;
use std::str::FromStr;

/// Longest accepted session lifetime (30 days).
const MAX_SESSION_TTL_SECONDS: u64 = 30 * 24 * 60 * 60;
/// Longest accepted rate-limit window (1 day).
const MAX_RATE_LIMIT_WINDOW_SECONDS: u64 = 24 * 60 * 60;

/// Bootstrap credentials for the first administrator.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
    pub jwt_secret: String,
    pub session_ttl_seconds: u64,
    pub server_port: u16,
    /// Selects production cookie attributes (`Secure`).
    pub production: bool,
    pub rate_limit_window_seconds: u64,
    pub auth_rate_limit_max: u32,
    pub general_rate_limit_max: u32,
    /// Take the client address from `X-Forwarded-For`/`X-Real-IP`. Only set
    /// behind a reverse proxy that overwrites those headers.
    pub trust_proxy_headers: bool,
    pub bcrypt_cost: u32,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL not set")?;

        let max_connections = parse_or(&lookup, "DB_MAX_CONNECTIONS", 5u32)?;
        let acquire_timeout_seconds = parse_or(&lookup, "DB_ACQUIRE_TIMEOUT_SECONDS", 3u64)?;

        // No fallback secret: an unsigned deployment must not start.
        let jwt_secret = lookup("JWT_SECRET").context("JWT_SECRET not set")?;
        if jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }
        if jwt_secret.len() < 32 {
            tracing::warn!("JWT_SECRET is shorter than 32 bytes; use a longer random secret");
        }

        let session_ttl_seconds = parse_in_range(
            &lookup,
            "SESSION_TTL_SECONDS",
            8 * 60 * 60,
            1,
            MAX_SESSION_TTL_SECONDS,
        )?;
        let server_port = parse_or(&lookup, "SERVER_PORT", 3000u16)?;

        let production = lookup("APP_ENV")
            .map(|value| value.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let rate_limit_window_seconds = parse_in_range(
            &lookup,
            "RATE_LIMIT_WINDOW_SECONDS",
            900,
            1,
            MAX_RATE_LIMIT_WINDOW_SECONDS,
        )?;
        let auth_rate_limit_max = parse_or(&lookup, "AUTH_RATE_LIMIT_MAX", 5u32)?;
        let general_rate_limit_max = parse_or(&lookup, "GENERAL_RATE_LIMIT_MAX", 100u32)?;
        let trust_proxy_headers = lookup("TRUST_PROXY_HEADERS")
            .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let bcrypt_cost = parse_or(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?;

        let bootstrap_admin = match (
            lookup("BOOTSTRAP_ADMIN_USERNAME"),
            lookup("BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Some(username), Some(password)) => Some(BootstrapAdmin {
                email: lookup("BOOTSTRAP_ADMIN_EMAIL")
                    .unwrap_or_else(|| format!("{}@localhost", username)),
                username,
                password,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            max_connections,
            acquire_timeout_seconds,
            jwt_secret,
            session_ttl_seconds,
            server_port,
            production,
            rate_limit_window_seconds,
            auth_rate_limit_max,
            general_rate_limit_max,
            trust_proxy_headers,
            bcrypt_cost,
            bootstrap_admin,
        })
    }
}

#[cfg(test)]
impl Config {
    /// Configuration used by unit and pipeline tests.
    pub fn for_tests() -> Self {
        Config {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
            acquire_timeout_seconds: 3,
            jwt_secret: "test-secret-test-secret-test-secret".to_string(),
            session_ttl_seconds: 8 * 60 * 60,
            server_port: 0,
            production: false,
            rate_limit_window_seconds: 900,
            auth_rate_limit_max: 5,
            general_rate_limit_max: 100,
            trust_proxy_headers: false,
            bcrypt_cost: 4,
            bootstrap_admin: None,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .ok()
            .with_context(|| format!("{} must be a valid number", key)),
        None => Ok(default),
    }
}

fn parse_in_range<F, T>(lookup: &F, key: &str, default: T, min: T, max: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd + Display + Copy,
{
    let value = parse_or(lookup, key, default)?;
    if value < min || value > max {
        bail!("{} must be between {} and {} (got {})", key, min, max, value);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        let result = Config::from_lookup(lookup_from(&[("DATABASE_URL", "sqlite::memory:")]));
        assert!(result.is_err());

        let result = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("JWT_SECRET", "   "),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
        ]))
        .unwrap();

        assert_eq!(config.session_ttl_seconds, 28800);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.auth_rate_limit_max, 5);
        assert_eq!(config.general_rate_limit_max, 100);
        assert!(!config.production);
        assert!(!config.trust_proxy_headers);
        assert!(config.bootstrap_admin.is_none());
    }

    #[test]
    fn test_production_and_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("APP_ENV", "Production"),
            ("AUTH_RATE_LIMIT_MAX", "10"),
            ("TRUST_PROXY_HEADERS", "true"),
            ("BOOTSTRAP_ADMIN_USERNAME", "root"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "changeme123"),
        ]))
        .unwrap();

        assert!(config.production);
        assert_eq!(config.auth_rate_limit_max, 10);
        assert!(config.trust_proxy_headers);
        let admin = config.bootstrap_admin.unwrap();
        assert_eq!(admin.email, "root@localhost");
    }

    #[test]
    fn test_durations_are_bounded() {
        let base = [
            ("DATABASE_URL", "sqlite::memory:"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
        ];
        let with = |key: &'static str, value: &'static str| {
            let mut pairs = base.to_vec();
            pairs.push((key, value));
            Config::from_lookup(lookup_from(&pairs))
        };

        assert!(with("RATE_LIMIT_WINDOW_SECONDS", "0").is_err());
        assert!(with("RATE_LIMIT_WINDOW_SECONDS", "18446744073709551615").is_err());
        assert!(with("RATE_LIMIT_WINDOW_SECONDS", "86401").is_err());
        assert_eq!(
            with("RATE_LIMIT_WINDOW_SECONDS", "86400").unwrap().rate_limit_window_seconds,
            86400
        );

        assert!(with("SESSION_TTL_SECONDS", "0").is_err());
        assert!(with("SESSION_TTL_SECONDS", "9223372036854775807").is_err());
        assert_eq!(
            with("SESSION_TTL_SECONDS", "2592000").unwrap().session_ttl_seconds,
            2_592_000
        );
    }

    #[test]
    fn test_invalid_number_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "sqlite::memory:"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("SERVER_PORT", "eighty"),
        ]));
        assert!(result.is_err());
    }
}
