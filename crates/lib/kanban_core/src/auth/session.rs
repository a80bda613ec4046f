//! Session lifecycle: issuance, per-request authentication, rotation and
//! logout.
//!
//! A token pair moves `ISSUED → ACTIVE → {REVOKED | ROTATED | EXPIRED}`:
//!
//! - `REVOKED`: the access token's fingerprint is in the revocation set
//!   (logout). Authentication fails with `token invalidated` until the
//!   token's own expiry.
//! - `ROTATED`: the refresh token was consumed by [`SessionService::refresh`]
//!   and a new pair minted. The old access token is left to expire on its
//!   own; the old refresh token is gone for good.
//! - `EXPIRED`: signature verification rejects the access token; no
//!   revocation row is ever written for it.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use super::fingerprint::{Fingerprint, generate_refresh_token, is_well_formed_refresh_token};
use super::jwt::TokenKeys;
use super::password::{BCRYPT_COST, hash_password, verify_password};
use super::revocation::RevocationStore;
use super::roles::authorize_role_change;
use super::users::UserStore;
use super::{AuthError, Hop, Unauthenticated, bounded};
use crate::models::auth::{Principal, Role, TokenPair, User};

/// Refresh token lifetime: 7 days.
pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 7;

/// Minimum accepted password length at registration.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Tunables for [`SessionService`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound on any single store call.
    pub store_timeout: Duration,
    /// Refresh token lifetime.
    pub refresh_ttl: chrono::Duration,
    /// bcrypt cost used at registration.
    pub bcrypt_cost: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store_timeout: Duration::from_secs(5),
            refresh_ttl: chrono::Duration::days(REFRESH_TOKEN_EXPIRY_DAYS),
            bcrypt_cost: BCRYPT_COST,
        }
    }
}

/// Orchestrates the token lifecycle over the verifier and the stores.
pub struct SessionService {
    keys: TokenKeys,
    revocations: Arc<dyn RevocationStore>,
    users: Arc<dyn UserStore>,
    config: SessionConfig,
}

impl SessionService {
    pub fn new(
        keys: TokenKeys,
        revocations: Arc<dyn RevocationStore>,
        users: Arc<dyn UserStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            keys,
            revocations,
            users,
            config,
        }
    }

    /// Access token lifetime in seconds.
    pub fn access_ttl_secs(&self) -> i64 {
        self.keys.ttl_secs()
    }

    /// Refresh token lifetime in seconds.
    pub fn refresh_ttl_secs(&self) -> i64 {
        self.config.refresh_ttl.num_seconds()
    }

    /// Mint a fresh access/refresh pair for `user`.
    pub async fn issue(&self, user: &User) -> Result<TokenPair, AuthError> {
        let now = Utc::now();
        let access_token = self.keys.issue(user, now)?;
        let refresh_token = generate_refresh_token();
        let expires_at = now + self.config.refresh_ttl;
        bounded(
            self.config.store_timeout,
            self.revocations
                .issue_refresh(&Fingerprint::of(&refresh_token), user.id, expires_at),
        )
        .await?;
        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.keys.ttl_secs(),
        })
    }

    /// Resolve a bearer token to the current principal.
    pub async fn authenticate(&self, access_token: Option<&str>) -> Result<Principal, AuthError> {
        let token = access_token
            .filter(|t| !t.is_empty())
            .ok_or(Unauthenticated::MissingToken)?;

        let claims = self.keys.verify(token).ok_or(Unauthenticated::InvalidToken)?;

        let revoked = bounded(
            self.config.store_timeout,
            self.revocations.is_revoked(&Fingerprint::of(token)),
        )
        .await?;
        if revoked {
            debug!(user_id = %claims.sub, "rejected revoked access token");
            return Err(Unauthenticated::TokenInvalidated.into());
        }

        let user = bounded(self.config.store_timeout, self.users.find_by_id(claims.sub))
            .await?
            .ok_or(Unauthenticated::InvalidToken)?;
        Ok(user.into())
    }

    /// Revoke the access token and retire the refresh token, if given.
    ///
    /// An access token that no longer verifies needs no revocation row.
    pub async fn logout(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), AuthError> {
        if let Some(claims) = self.keys.verify(access_token) {
            bounded(
                self.config.store_timeout,
                self.revocations
                    .revoke(&Fingerprint::of(access_token), claims.expires_at()),
            )
            .await?;
            debug!(user_id = %claims.sub, "access token revoked");
        }
        if let Some(refresh) = refresh_token.filter(|t| !t.is_empty()) {
            bounded(
                self.config.store_timeout,
                self.revocations.discard_refresh(&Fingerprint::of(refresh)),
            )
            .await?;
        }
        Ok(())
    }

    /// Retire every refresh token the principal holds.
    pub async fn logout_all(&self, principal: &Principal) -> Result<u64, AuthError> {
        let removed = bounded(
            self.config.store_timeout,
            self.revocations.discard_user_refresh(principal.id),
        )
        .await?;
        info!(user_id = %principal.id, removed, "all refresh tokens retired");
        Ok(removed)
    }

    /// Exchange a refresh token for a new pair (single-use rotation).
    ///
    /// The caller's access token plays no part, so this works after it has
    /// expired. Every refresh failure is reported as `invalid refresh token`.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<TokenPair, AuthError> {
        let token = refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(Unauthenticated::RefreshTokenRequired)?;
        if !is_well_formed_refresh_token(token) {
            return Err(Unauthenticated::InvalidRefreshToken.into());
        }

        let user_id = bounded(
            self.config.store_timeout,
            self.revocations.consume_refresh(&Fingerprint::of(token)),
        )
        .await?
        .ok_or(Unauthenticated::InvalidRefreshToken)?;

        let user = bounded(self.config.store_timeout, self.users.find_by_id(user_id))
            .await?
            .ok_or(Unauthenticated::InvalidRefreshToken)?;

        debug!(user_id = %user.id, "refresh token rotated");
        self.issue(&user).await
    }

    /// Authenticate with email + password.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, TokenPair), AuthError> {
        let email = normalize_email(email);
        let record = bounded(self.config.store_timeout, self.users.find_by_email(&email))
            .await?
            .ok_or(Unauthenticated::InvalidCredentials)?;

        if !verify_password(password, &record.password_hash) {
            return Err(Unauthenticated::InvalidCredentials.into());
        }

        let tokens = self.issue(&record.user).await?;
        Ok((record.user, tokens))
    }

    /// Register a new account. The first account becomes superadmin.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<(User, TokenPair), AuthError> {
        let email = normalize_email(email);
        if !email.contains('@') {
            return Err(AuthError::Validation("A valid email is required".into()));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let display_name = match display_name.trim() {
            "" => email.split('@').next().unwrap_or_default().to_string(),
            name => name.to_string(),
        };

        let is_first_user = bounded(self.config.store_timeout, self.users.count()).await? == 0;
        let role = if is_first_user {
            Role::Superadmin
        } else {
            Role::User
        };

        let password_hash = hash_password(password, self.config.bcrypt_cost)?;
        let user = bounded(
            self.config.store_timeout,
            self.users.create(&email, &display_name, &password_hash, role),
        )
        .await?
        .ok_or_else(|| AuthError::Conflict("Email already registered".into()))?;

        if is_first_user {
            info!(user_id = %user.id, "first user granted superadmin role");
        }

        let tokens = self.issue(&user).await?;
        Ok((user, tokens))
    }

    /// Set `target_id`'s role on behalf of `actor`, subject to the
    /// elevation policy. The target is loaded fresh so the policy sees its
    /// current role.
    pub async fn change_role(
        &self,
        actor: &Principal,
        target_id: Uuid,
        new_role: Role,
    ) -> Result<User, AuthError> {
        let target = bounded(self.config.store_timeout, self.users.find_by_id(target_id))
            .await?
            .ok_or(AuthError::NotFound(Hop::User))?;
        authorize_role_change(actor, &target, new_role)?;

        let updated = bounded(
            self.config.store_timeout,
            self.users.update_role(target_id, new_role),
        )
        .await?
        .ok_or(AuthError::NotFound(Hop::User))?;
        info!(
            actor_id = %actor.id,
            user_id = %updated.id,
            from = %target.role,
            to = %updated.role,
            "role changed"
        );
        Ok(updated)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
