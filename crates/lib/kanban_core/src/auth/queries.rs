//! Postgres-backed stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::fingerprint::Fingerprint;
use super::ownership::BoardDirectory;
use super::revocation::{GcReport, RevocationStore};
use super::users::UserStore;
use super::{AuthError, SystemError};
use crate::models::auth::{Role, User, UserWithPassword};
use crate::models::board::{Board, Column, Item};
use crate::uuid::uuidv7;

// ---------------------------------------------------------------------------
// Revocation store
// ---------------------------------------------------------------------------

/// `revoked_tokens` + `refresh_tokens` tables.
#[derive(Clone)]
pub struct PgRevocationStore {
    pool: PgPool,
}

impl PgRevocationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationStore for PgRevocationStore {
    async fn revoke(&self, fp: &Fingerprint, expires_at: DateTime<Utc>) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO revoked_tokens (token_hash, expires_at) VALUES ($1, $2) \
             ON CONFLICT (token_hash) DO NOTHING",
        )
        .bind(fp.as_str())
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_revoked(&self, fp: &Fingerprint) -> Result<bool, AuthError> {
        let revoked = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM revoked_tokens \
             WHERE token_hash = $1 AND expires_at > now())",
        )
        .bind(fp.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(revoked)
    }

    async fn issue_refresh(
        &self,
        fp: &Fingerprint,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        sqlx::query(
            "INSERT INTO refresh_tokens (token_hash, user_id, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(fp.as_str())
        .bind(user_id)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn consume_refresh(&self, fp: &Fingerprint) -> Result<Option<Uuid>, AuthError> {
        // One statement: of two concurrent deletes only one gets the row back.
        let user_id = sqlx::query_scalar::<_, Uuid>(
            "DELETE FROM refresh_tokens \
             WHERE token_hash = $1 AND expires_at > now() \
             RETURNING user_id",
        )
        .bind(fp.as_str())
        .fetch_optional(&self.pool)
        .await?;
        Ok(user_id)
    }

    async fn discard_refresh(&self, fp: &Fingerprint) -> Result<(), AuthError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(fp.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn discard_user_refresh(&self, user_id: Uuid) -> Result<u64, AuthError> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn gc(&self) -> Result<GcReport, AuthError> {
        let revoked = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= now()")
            .execute(&self.pool)
            .await?
            .rows_affected();
        let refresh = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= now()")
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(GcReport { revoked, refresh })
    }
}

// ---------------------------------------------------------------------------
// User store
// ---------------------------------------------------------------------------

type UserRow = (Uuid, String, String, String);

fn user_from_row((id, email, display_name, role): UserRow) -> Result<User, AuthError> {
    let role = role
        .parse::<Role>()
        .map_err(|e| SystemError::Internal(e.to_string()))?;
    Ok(User {
        id,
        email,
        display_name,
        role,
    })
}

/// `users` table.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, display_name, role FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(user_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithPassword>, AuthError> {
        let row = sqlx::query_as::<_, (Uuid, String, String, String, String)>(
            "SELECT id, email, display_name, role, password_hash FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|(id, email, display_name, role, password_hash)| {
            Ok(UserWithPassword {
                user: user_from_row((id, email, display_name, role))?,
                password_hash,
            })
        })
        .transpose()
    }

    async fn create(
        &self,
        email: &str,
        display_name: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Option<User>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (id, email, display_name, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (email) DO NOTHING \
             RETURNING id, email, display_name, role",
        )
        .bind(uuidv7())
        .bind(email)
        .bind(display_name)
        .bind(password_hash)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(user_from_row).transpose()
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<Option<User>, AuthError> {
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET role = $2 WHERE id = $1 \
             RETURNING id, email, display_name, role",
        )
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(user_from_row).transpose()
    }

    async fn count(&self) -> Result<i64, AuthError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// Board directory
// ---------------------------------------------------------------------------

/// `boards`, `board_columns`, `items` and `item_assignees` tables.
#[derive(Clone)]
pub struct PgBoardDirectory {
    pool: PgPool,
}

impl PgBoardDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BoardDirectory for PgBoardDirectory {
    async fn find_board(&self, id: Uuid) -> Result<Option<Board>, AuthError> {
        let row = sqlx::query_as::<_, (Uuid, Uuid, String)>(
            "SELECT id, owner_id, name FROM boards WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, owner_id, name)| Board { id, owner_id, name }))
    }

    async fn find_column(&self, id: Uuid) -> Result<Option<Column>, AuthError> {
        let row = sqlx::query_as::<_, (Uuid, Uuid)>(
            "SELECT id, board_id FROM board_columns WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, board_id)| Column { id, board_id }))
    }

    async fn find_item(&self, id: Uuid) -> Result<Option<Item>, AuthError> {
        let row = sqlx::query_as::<_, (Uuid, Uuid)>("SELECT id, column_id FROM items WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id, column_id)| Item { id, column_id }))
    }

    async fn has_assignment_on_board(
        &self,
        board_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AuthError> {
        let assigned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(\
               SELECT 1 FROM item_assignees ia \
               JOIN items i ON i.id = ia.item_id \
               JOIN board_columns c ON c.id = i.column_id \
               WHERE c.board_id = $1 AND ia.user_id = $2)",
        )
        .bind(board_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(assigned)
    }
}
