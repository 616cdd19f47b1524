//! Role-based permission table and the permission gate.
//!
//! Authorization policy is pure data: every role maps to a fixed list of
//! permission strings, and a request is allowed when its token carries the
//! required permission or the override permission. Nothing in here branches
//! on a particular role.

use crate::errors::{ServiceError, ServiceResult};
use crate::utils::jwt::Claims;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Grants every permission.
pub const OVERRIDE: &str = "*";

pub const DASHBOARD_READ: &str = "dashboard:read";
pub const INVENTORY_READ: &str = "inventory:read";
pub const INVENTORY_WRITE: &str = "inventory:write";
pub const INVENTORY_DELETE: &str = "inventory:delete";
pub const PRODUCTION_READ: &str = "production:read";
pub const PRODUCTION_WRITE: &str = "production:write";
pub const USERS_READ: &str = "users:read";
pub const USERS_WRITE: &str = "users:write";

const VIEWER: &[&str] = &[DASHBOARD_READ, INVENTORY_READ, PRODUCTION_READ];

const OPERATOR: &[&str] = &[
    DASHBOARD_READ,
    INVENTORY_READ,
    PRODUCTION_READ,
    INVENTORY_WRITE,
    PRODUCTION_WRITE,
];

const SUPERVISOR: &[&str] = &[
    DASHBOARD_READ,
    INVENTORY_READ,
    PRODUCTION_READ,
    INVENTORY_WRITE,
    PRODUCTION_WRITE,
    INVENTORY_DELETE,
    USERS_READ,
];

const ADMIN: &[&str] = &[
    DASHBOARD_READ,
    INVENTORY_READ,
    PRODUCTION_READ,
    INVENTORY_WRITE,
    PRODUCTION_WRITE,
    INVENTORY_DELETE,
    USERS_READ,
    USERS_WRITE,
    OVERRIDE,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Supervisor,
    Operator,
    Viewer,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Supervisor, Role::Operator, Role::Viewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Supervisor => "supervisor",
            Role::Operator => "operator",
            Role::Viewer => "viewer",
        }
    }

    /// The static permission list carried by tokens issued for this role.
    pub fn permissions(&self) -> &'static [&'static str] {
        match self {
            Role::Admin => ADMIN,
            Role::Supervisor => SUPERVISOR,
            Role::Operator => OPERATOR,
            Role::Viewer => VIEWER,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ServiceError::validation(format!(
                    "role: must be one of admin, supervisor, operator, viewer (got '{}')",
                    s
                ))
            })
    }
}

/// Checks the token's permission set for `required` or the override.
pub fn has_permission(claims: &Claims, required: &str) -> bool {
    claims
        .permissions
        .iter()
        .any(|granted| granted == required || granted == OVERRIDE)
}

/// Permission gate used at the top of every protected handler.
pub fn ensure_permission(claims: &Claims, required: &str) -> ServiceResult<()> {
    if has_permission(claims, required) {
        return Ok(());
    }

    tracing::warn!(
        user_id = %claims.sub,
        role = %claims.role,
        required,
        "Permission denied"
    );
    Err(ServiceError::permission_denied(format!(
        "Missing required permission '{}'",
        required
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_with(permissions: &[&str]) -> Claims {
        Claims {
            sub: "user-1".to_string(),
            username: "tester".to_string(),
            role: "viewer".to_string(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            exp: 0,
            iat: 0,
        }
    }

    #[test]
    fn test_roles_are_nested() {
        let chain = [Role::Viewer, Role::Operator, Role::Supervisor, Role::Admin];
        for pair in chain.windows(2) {
            let (lower, higher) = (pair[0], pair[1]);
            for permission in lower.permissions() {
                assert!(
                    higher.permissions().contains(permission),
                    "{} should include {} from {}",
                    higher,
                    permission,
                    lower
                );
            }
            assert!(higher.permissions().len() > lower.permissions().len());
        }
    }

    #[test]
    fn test_viewer_is_read_only() {
        assert!(
            Role::Viewer
                .permissions()
                .iter()
                .all(|p| p.ends_with(":read"))
        );
    }

    #[test]
    fn test_only_admin_carries_override() {
        for role in Role::ALL {
            assert_eq!(role.permissions().contains(&OVERRIDE), role == Role::Admin);
        }
    }

    #[test]
    fn test_has_permission() {
        let viewer = claims_with(Role::Viewer.permissions());
        assert!(has_permission(&viewer, INVENTORY_READ));
        assert!(!has_permission(&viewer, INVENTORY_WRITE));
        assert!(ensure_permission(&viewer, USERS_WRITE).is_err());

        let overridden = claims_with(&[OVERRIDE]);
        assert!(has_permission(&overridden, USERS_WRITE));
        assert!(has_permission(&overridden, "reports:export"));

        let empty = claims_with(&[]);
        assert!(!has_permission(&empty, DASHBOARD_READ));
    }

    #[test]
    fn test_exact_match_required() {
        let claims = claims_with(&["inventory:read"]);
        assert!(!has_permission(&claims, "inventory"));
        assert!(!has_permission(&claims, "inventory:read:all"));
        assert!(!has_permission(&claims, "INVENTORY:READ"));
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("Supervisor".parse::<Role>().unwrap(), Role::Supervisor);
        assert!("root".parse::<Role>().is_err());
    }
}
