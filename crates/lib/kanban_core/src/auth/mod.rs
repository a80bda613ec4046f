//! Authentication and authorization logic.
//!
//! Provides credential issuance and verification, the revocation store,
//! the session lifecycle, role gating and board ownership resolution, shared
//! by `kanban_api` route layers.

pub mod fingerprint;
pub mod jwt;
pub mod memory;
pub mod ownership;
pub mod password;
pub mod queries;
pub mod revocation;
pub mod roles;
pub mod session;
pub mod users;

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Why a request is unauthenticated.
///
/// [`Unauthenticated::code`] is the short machine-checkable reason; the
/// `Display` impl is the user-visible message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Unauthenticated {
    #[error("Unauthorized - missing token")]
    MissingToken,

    #[error("Unauthorized - invalid token")]
    InvalidToken,

    #[error("Token has been invalidated")]
    TokenInvalidated,

    #[error("Refresh token required")]
    RefreshTokenRequired,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Invalid credentials")]
    InvalidCredentials,
}

impl Unauthenticated {
    pub fn code(self) -> &'static str {
        match self {
            Unauthenticated::MissingToken => "missing token",
            Unauthenticated::InvalidToken => "invalid token",
            Unauthenticated::TokenInvalidated => "token invalidated",
            Unauthenticated::RefreshTokenRequired => "refresh token required",
            Unauthenticated::InvalidRefreshToken => "invalid refresh token",
            Unauthenticated::InvalidCredentials => "invalid credentials",
        }
    }
}

/// Why an authenticated principal may not proceed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Forbidden {
    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Access denied")]
    AccessDenied,

    /// Role-elevation policy violation, with the policy detail.
    #[error("{0}")]
    RoleChange(&'static str),
}

/// The containment hop that failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hop {
    Item,
    Column,
    Board,
    User,
}

impl std::fmt::Display for Hop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Hop::Item => "Item",
            Hop::Column => "Column",
            Hop::Board => "Board",
            Hop::User => "User",
        })
    }
}

/// Storage-side failures. Never downgraded to a pass.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Authentication and authorization errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Unauthenticated(Unauthenticated),

    #[error("{0}")]
    Forbidden(Forbidden),

    #[error("{0} not found")]
    NotFound(Hop),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    System(#[from] SystemError),
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::System(SystemError::Db(e))
    }
}

impl From<Unauthenticated> for AuthError {
    fn from(reason: Unauthenticated) -> Self {
        AuthError::Unauthenticated(reason)
    }
}

impl From<Forbidden> for AuthError {
    fn from(reason: Forbidden) -> Self {
        AuthError::Forbidden(reason)
    }
}

/// Run a store call under a deadline; elapsing is a system error.
pub(crate) async fn bounded<T, F>(limit: Duration, fut: F) -> Result<T, AuthError>
where
    F: Future<Output = Result<T, AuthError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(SystemError::Timeout(limit).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_stable() {
        assert_eq!(
            AuthError::from(Unauthenticated::MissingToken).to_string(),
            "Unauthorized - missing token"
        );
        assert_eq!(
            AuthError::from(Unauthenticated::TokenInvalidated).to_string(),
            "Token has been invalidated"
        );
        assert_eq!(
            AuthError::from(Forbidden::InsufficientPermissions).to_string(),
            "Insufficient permissions"
        );
        assert_eq!(
            AuthError::from(Unauthenticated::InvalidRefreshToken).to_string(),
            "Invalid refresh token"
        );
        assert_eq!(AuthError::NotFound(Hop::Column).to_string(), "Column not found");
    }

    #[test]
    fn reason_codes_are_distinct() {
        let codes = [
            Unauthenticated::MissingToken,
            Unauthenticated::InvalidToken,
            Unauthenticated::TokenInvalidated,
            Unauthenticated::RefreshTokenRequired,
            Unauthenticated::InvalidRefreshToken,
            Unauthenticated::InvalidCredentials,
        ]
        .map(Unauthenticated::code);
        let mut unique = codes.to_vec();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), codes.len());
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_times_out_as_system_error() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, AuthError>(())
        };
        let err = bounded(Duration::from_secs(1), slow).await.unwrap_err();
        assert!(matches!(err, AuthError::System(SystemError::Timeout(_))));
    }
}
