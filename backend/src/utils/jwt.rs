//! JWT token utilities for authentication and authorization.
//!
//! Provides session token creation, validation, and claims management. Tokens
//! carry the user's role and the role's permission list so the permission
//! gate never needs to touch the database.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::auth::permissions::Role;
use crate::config::Config;
use crate::database::models::User;
use crate::errors::{ServiceError, ServiceResult};

/// JWT Claims structure containing identity and permission data
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User ID
    pub sub: String,
    pub username: String,
    /// User role
    pub role: String,
    /// Permissions granted by the role at issue time
    pub permissions: Vec<String>,
    /// Token expiration timestamp
    pub exp: usize,
    /// Token issued at timestamp
    pub iat: usize,
}

/// JWT token utility for creating and validating tokens
pub struct JwtUtils {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: u64,
}

impl JwtUtils {
    /// Create a new JwtUtils instance from the configured secret
    pub fn new(config: &Config) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // An `exp` in the past must always fail.
        validation.leeway = 0;

        JwtUtils {
            encoding_key,
            decoding_key,
            validation,
            ttl_seconds: config.session_ttl_seconds,
        }
    }

    /// Lifetime of issued tokens in seconds.
    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Generate a session token for the user, embedding role permissions
    pub fn generate_token(&self, user: &User) -> ServiceResult<String> {
        let role = Role::from_str(&user.role)
            .map_err(|_| ServiceError::internal_error(format!("unknown role '{}'", user.role)))?;

        let now = Utc::now();
        let exp = now + Duration::seconds(self.ttl_seconds as i64);

        let claims = Claims {
            sub: user.id.clone(),
            username: user.username.clone(),
            role: role.to_string(),
            permissions: role.permissions().iter().map(|p| p.to_string()).collect(),
            exp: exp.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        self.encode_claims(&claims)
    }

    pub(crate) fn encode_claims(&self, claims: &Claims) -> ServiceResult<String> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| ServiceError::internal_error(format!("Token generation failed: {}", e)))
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> ServiceResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|token_data| token_data.claims)
            .map_err(|e| ServiceError::invalid_token(format!("{:?}", e.kind())))
    }
}

impl Claims {
    pub fn user_id(&self) -> &str {
        &self.sub
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::permissions;

    fn test_user(role: &str) -> User {
        User {
            id: "0198a1b2-0000-7000-8000-000000000001".to_string(),
            username: "jdoe".to_string(),
            email: "jdoe@example.com".to_string(),
            role: role.to_string(),
            department: Some("assembly".to_string()),
            shift: None,
            password_hash: String::new(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_token_carries_role_permissions() {
        let jwt = JwtUtils::new(&Config::for_tests());
        let token = jwt.generate_token(&test_user("operator")).unwrap();
        let claims = jwt.validate_token(&token).unwrap();

        assert_eq!(claims.user_id(), "0198a1b2-0000-7000-8000-000000000001");
        assert_eq!(claims.role, "operator");
        assert!(claims.permissions.iter().any(|p| p == permissions::INVENTORY_WRITE));
        assert!(!claims.permissions.iter().any(|p| p == permissions::USERS_WRITE));
        assert_eq!(claims.exp - claims.iat, 8 * 60 * 60);
    }

    #[test]
    fn test_expired_token_rejected_despite_valid_signature() {
        let jwt = JwtUtils::new(&Config::for_tests());
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: "u".to_string(),
            username: "u".to_string(),
            role: "admin".to_string(),
            permissions: vec![permissions::OVERRIDE.to_string()],
            iat: now - 120,
            exp: now - 1,
        };
        let token = jwt.encode_claims(&claims).unwrap();

        let err = jwt.validate_token(&token).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidToken { .. }));
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let jwt = JwtUtils::new(&Config::for_tests());
        let mut other_config = Config::for_tests();
        other_config.jwt_secret = "a-completely-different-signing-secret".to_string();
        let forged = JwtUtils::new(&other_config)
            .generate_token(&test_user("admin"))
            .unwrap();

        assert!(matches!(
            jwt.validate_token(&forged),
            Err(ServiceError::InvalidToken { .. })
        ));
    }

    #[test]
    fn test_malformed_token_rejected() {
        let jwt = JwtUtils::new(&Config::for_tests());
        for token in ["", "not-a-jwt", "a.b.c"] {
            assert!(jwt.validate_token(token).is_err(), "{}", token);
        }
    }

    #[test]
    fn test_unknown_role_cannot_be_issued() {
        let jwt = JwtUtils::new(&Config::for_tests());
        assert!(jwt.generate_token(&test_user("root")).is_err());
    }
}
