//! In-memory store implementations.
//!
//! Backed by `DashMap` so they are safe to share across request tasks. Used
//! by tests and by the server's `--ephemeral` mode; state dies with the
//! process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use uuid::Uuid;

use super::AuthError;
use super::fingerprint::Fingerprint;
use super::ownership::BoardDirectory;
use super::revocation::{GcReport, RevocationStore};
use super::users::UserStore;
use crate::models::auth::{Role, User, UserWithPassword};
use crate::models::board::{Board, Column, Item};
use crate::uuid::uuidv7;

// ---------------------------------------------------------------------------
// Revocation store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct RefreshEntry {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

/// Revocation and refresh-token sets held in process memory.
#[derive(Debug, Default)]
pub struct MemoryRevocationStore {
    revoked: DashMap<Fingerprint, DateTime<Utc>>,
    refresh: DashMap<Fingerprint, RefreshEntry>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw row counts `(revoked, refresh)`, expired rows included.
    pub fn len(&self) -> (usize, usize) {
        (self.revoked.len(), self.refresh.len())
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn revoke(&self, fp: &Fingerprint, expires_at: DateTime<Utc>) -> Result<(), AuthError> {
        self.revoked.entry(fp.clone()).or_insert(expires_at);
        Ok(())
    }

    async fn is_revoked(&self, fp: &Fingerprint) -> Result<bool, AuthError> {
        let now = Utc::now();
        Ok(self.revoked.get(fp).is_some_and(|exp| *exp > now))
    }

    async fn issue_refresh(
        &self,
        fp: &Fingerprint,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        self.refresh
            .insert(fp.clone(), RefreshEntry { user_id, expires_at });
        Ok(())
    }

    async fn consume_refresh(&self, fp: &Fingerprint) -> Result<Option<Uuid>, AuthError> {
        let now = Utc::now();
        Ok(self
            .refresh
            .remove_if(fp, |_, entry| entry.expires_at > now)
            .map(|(_, entry)| entry.user_id))
    }

    async fn discard_refresh(&self, fp: &Fingerprint) -> Result<(), AuthError> {
        self.refresh.remove(fp);
        Ok(())
    }

    async fn discard_user_refresh(&self, user_id: Uuid) -> Result<u64, AuthError> {
        let mut removed = 0;
        self.refresh.retain(|_, entry| {
            let keep = entry.user_id != user_id;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }

    async fn gc(&self) -> Result<GcReport, AuthError> {
        let now = Utc::now();
        let mut report = GcReport::default();
        self.revoked.retain(|_, exp| {
            let keep = *exp > now;
            if !keep {
                report.revoked += 1;
            }
            keep
        });
        self.refresh.retain(|_, entry| {
            let keep = entry.expires_at > now;
            if !keep {
                report.refresh += 1;
            }
            keep
        });
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// User store
// ---------------------------------------------------------------------------

/// Users keyed by id, with a unique email index.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: DashMap<Uuid, UserWithPassword>,
    emails: DashMap<String, Uuid>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a user outright (as if deleted by the CRUD layer).
    pub fn remove(&self, id: Uuid) {
        if let Some((_, record)) = self.users.remove(&id) {
            self.emails.remove(&record.user.email);
        }
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AuthError> {
        Ok(self.users.get(&id).map(|r| r.user.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserWithPassword>, AuthError> {
        let Some(id) = self.emails.get(email).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.users.get(&id).map(|r| r.clone()))
    }

    async fn create(
        &self,
        email: &str,
        display_name: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Option<User>, AuthError> {
        match self.emails.entry(email.to_string()) {
            Entry::Occupied(_) => Ok(None),
            Entry::Vacant(slot) => {
                let user = User {
                    id: uuidv7(),
                    email: email.to_string(),
                    display_name: display_name.to_string(),
                    role,
                };
                self.users.insert(
                    user.id,
                    UserWithPassword {
                        user: user.clone(),
                        password_hash: password_hash.to_string(),
                    },
                );
                slot.insert(user.id);
                Ok(Some(user))
            }
        }
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<Option<User>, AuthError> {
        Ok(self.users.get_mut(&id).map(|mut r| {
            r.user.role = role;
            r.user.clone()
        }))
    }

    async fn count(&self) -> Result<i64, AuthError> {
        Ok(self.users.len() as i64)
    }
}

// ---------------------------------------------------------------------------
// Board directory
// ---------------------------------------------------------------------------

/// Board hierarchy plus item assignments.
#[derive(Debug, Default)]
pub struct MemoryBoardDirectory {
    boards: DashMap<Uuid, Board>,
    columns: DashMap<Uuid, Column>,
    items: DashMap<Uuid, Item>,
    /// `(item_id, user_id)` pairs.
    assignments: DashSet<(Uuid, Uuid)>,
}

impl MemoryBoardDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_board(&self, owner_id: Uuid, name: &str) -> Board {
        let board = Board {
            id: uuidv7(),
            owner_id,
            name: name.to_string(),
        };
        self.boards.insert(board.id, board.clone());
        board
    }

    pub fn add_column(&self, board_id: Uuid) -> Column {
        let column = Column {
            id: uuidv7(),
            board_id,
        };
        self.columns.insert(column.id, column.clone());
        column
    }

    pub fn add_item(&self, column_id: Uuid) -> Item {
        let item = Item {
            id: uuidv7(),
            column_id,
        };
        self.items.insert(item.id, item.clone());
        item
    }

    pub fn assign(&self, item_id: Uuid, user_id: Uuid) {
        self.assignments.insert((item_id, user_id));
    }

    pub fn remove_board(&self, id: Uuid) {
        self.boards.remove(&id);
    }

    pub fn remove_column(&self, id: Uuid) {
        self.columns.remove(&id);
    }

    fn board_of_item(&self, item_id: Uuid) -> Option<Uuid> {
        let column_id = self.items.get(&item_id)?.column_id;
        Some(self.columns.get(&column_id)?.board_id)
    }
}

#[async_trait]
impl BoardDirectory for MemoryBoardDirectory {
    async fn find_board(&self, id: Uuid) -> Result<Option<Board>, AuthError> {
        Ok(self.boards.get(&id).map(|b| b.clone()))
    }

    async fn find_column(&self, id: Uuid) -> Result<Option<Column>, AuthError> {
        Ok(self.columns.get(&id).map(|c| c.clone()))
    }

    async fn find_item(&self, id: Uuid) -> Result<Option<Item>, AuthError> {
        Ok(self.items.get(&id).map(|i| i.clone()))
    }

    async fn has_assignment_on_board(
        &self,
        board_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, AuthError> {
        Ok(self.assignments.iter().any(|pair| {
            let (item_id, assignee) = *pair;
            assignee == user_id && self.board_of_item(item_id) == Some(board_id)
        }))
    }
}
