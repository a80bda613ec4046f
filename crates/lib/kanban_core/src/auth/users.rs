//! Principal loading: the user store the core reads roles from.

use async_trait::async_trait;
use uuid::Uuid;

use super::AuthError;
use crate::models::auth::{Role, User, UserWithPassword};

/// Read/write access to user records needed by the session core.
///
/// The role returned here is the source of truth for every authorization
/// decision.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError>;

    /// Fetch a user together with their password hash (login only).
    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithPassword>, AuthError>;

    /// Create a user. Returns `Ok(None)` when the email is already taken.
    async fn create(
        &self,
        email: &str,
        display_name: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Option<User>, AuthError>;

    /// Set a user's role. Returns the updated user, or `None` if absent.
    async fn update_role(&self, id: Uuid, role: Role) -> Result<Option<User>, AuthError>;

    async fn count(&self) -> Result<i64, AuthError>;
}
