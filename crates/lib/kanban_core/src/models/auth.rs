//! Authentication domain models.
//!
//! These are internal domain models, distinct from the HTTP request and
//! response bodies in `kanban_api` (which carry `#[serde(rename)]` for
//! camelCase etc.).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User roles, totally ordered: `User < Admin < Superadmin`.
///
/// The derived `Ord` follows declaration order, so comparisons like
/// `role >= Role::Admin` express "at least admin".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular board user.
    User,
    /// Can manage regular users.
    Admin,
    /// Can manage everyone, including administrators.
    Superadmin,
}

impl Role {
    /// Numeric rank in the role hierarchy (1-based).
    pub fn rank(self) -> u8 {
        match self {
            Role::User => 1,
            Role::Admin => 2,
            Role::Superadmin => 3,
        }
    }

    /// Database / wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Superadmin => "superadmin",
        }
    }
}

impl Default for Role {
    /// Least privilege for newly registered accounts.
    fn default() -> Self {
        Role::User
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown role name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Case-insensitive parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "superadmin" => Ok(Role::Superadmin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Domain user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

/// User with password hash (for the login flow only).
#[derive(Debug, Clone)]
pub struct UserWithPassword {
    pub user: User,
    pub password_hash: String,
}

/// The authenticated identity and current role for one request.
///
/// Always built from a freshly loaded [`User`], never from token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub display_name: String,
}

impl From<User> for Principal {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
            display_name: user.display_name,
        }
    }
}

/// JWT claims embedded in access tokens.
///
/// Deliberately carries no role: authorization always reads the stored one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: user ID (standard JWT `sub` claim).
    pub sub: Uuid,
    /// User email.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
    /// Unique token id, keeps fingerprints distinct within one second.
    pub jti: Uuid,
}

impl TokenClaims {
    /// Expiry as a timestamp, for revocation records.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// A freshly minted access/refresh token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_totally_ordered() {
        assert!(Role::User < Role::Admin);
        assert!(Role::Admin < Role::Superadmin);
        assert_eq!(Role::User.rank(), 1);
        assert_eq!(Role::Admin.rank(), 2);
        assert_eq!(Role::Superadmin.rank(), 3);
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("Superadmin".parse::<Role>(), Ok(Role::Superadmin));
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert!("owner".parse::<Role>().is_err());
    }

    #[test]
    fn default_role_is_user() {
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn claims_expiry_converts_to_timestamp() {
        let claims = TokenClaims {
            sub: Uuid::nil(),
            email: "a@example.com".into(),
            name: "A".into(),
            iat: 1_700_000_000,
            exp: 1_700_003_600,
            jti: Uuid::nil(),
        };
        assert_eq!(claims.expires_at().timestamp(), 1_700_003_600);
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Superadmin).unwrap(), "\"superadmin\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }
}
