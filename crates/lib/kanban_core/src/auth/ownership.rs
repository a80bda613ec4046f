//! Board ownership and delegated-access resolution.
//!
//! Every resource resolves to its board by walking item → column → board.
//! The innermost missing hop is reported by name, so a deleted column reads
//! as `Column not found` rather than a generic denial.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::{AuthError, Forbidden, Hop, bounded};
use crate::models::auth::Principal;
use crate::models::board::{Board, Column, Item};

/// Read-only lookups into the board hierarchy.
#[async_trait]
pub trait BoardDirectory: Send + Sync {
    async fn find_board(&self, id: Uuid) -> Result<Option<Board>, AuthError>;
    async fn find_column(&self, id: Uuid) -> Result<Option<Column>, AuthError>;
    async fn find_item(&self, id: Uuid) -> Result<Option<Item>, AuthError>;

    /// Whether `user_id` is assigned to at least one item on the board.
    async fn has_assignment_on_board(&self, board_id: Uuid, user_id: Uuid)
    -> Result<bool, AuthError>;
}

/// A resource whose controlling board must be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceRef {
    Board(Uuid),
    Column(Uuid),
    Item(Uuid),
}

impl ResourceRef {
    /// Build from a resource kind name (`board`, `column`, `item`).
    pub fn parse(kind: &str, id: Uuid) -> Option<Self> {
        match kind {
            "board" | "boards" => Some(ResourceRef::Board(id)),
            "column" | "columns" => Some(ResourceRef::Column(id)),
            "item" | "items" => Some(ResourceRef::Item(id)),
            _ => None,
        }
    }
}

/// How a principal relates to a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Owner,
    Delegated,
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AccessLevel::Owner => "owner",
            AccessLevel::Delegated => "delegated",
        })
    }
}

/// Resolves resources to boards and checks ownership or delegated access.
pub struct OwnershipResolver {
    boards: Arc<dyn BoardDirectory>,
    store_timeout: Duration,
}

impl OwnershipResolver {
    pub fn new(boards: Arc<dyn BoardDirectory>, store_timeout: Duration) -> Self {
        Self {
            boards,
            store_timeout,
        }
    }

    /// Walk the containment chain to the controlling board.
    pub async fn resolve_board(&self, resource: ResourceRef) -> Result<Board, AuthError> {
        let board_id = match resource {
            ResourceRef::Board(id) => id,
            ResourceRef::Column(id) => self.column(id).await?.board_id,
            ResourceRef::Item(id) => {
                let item = bounded(self.store_timeout, self.boards.find_item(id))
                    .await?
                    .ok_or(AuthError::NotFound(Hop::Item))?;
                self.column(item.column_id).await?.board_id
            }
        };
        bounded(self.store_timeout, self.boards.find_board(board_id))
            .await?
            .ok_or(AuthError::NotFound(Hop::Board))
    }

    async fn column(&self, id: Uuid) -> Result<Column, AuthError> {
        bounded(self.store_timeout, self.boards.find_column(id))
            .await?
            .ok_or(AuthError::NotFound(Hop::Column))
    }

    /// Only the board owner passes.
    pub async fn require_ownership(
        &self,
        resource: ResourceRef,
        principal: &Principal,
    ) -> Result<Board, AuthError> {
        let board = self.resolve_board(resource).await?;
        if board.owner_id == principal.id {
            Ok(board)
        } else {
            debug!(board_id = %board.id, user_id = %principal.id, "ownership denied");
            Err(Forbidden::AccessDenied.into())
        }
    }

    /// The owner or any user assigned to an item on the board passes.
    pub async fn require_access(
        &self,
        resource: ResourceRef,
        principal: &Principal,
    ) -> Result<Board, AuthError> {
        self.access_level(resource, principal)
            .await
            .map(|(board, _)| board)
    }

    /// Classify the principal's relation to the resource's board.
    pub async fn access_level(
        &self,
        resource: ResourceRef,
        principal: &Principal,
    ) -> Result<(Board, AccessLevel), AuthError> {
        let board = self.resolve_board(resource).await?;
        if board.owner_id == principal.id {
            return Ok((board, AccessLevel::Owner));
        }
        let assigned = bounded(
            self.store_timeout,
            self.boards.has_assignment_on_board(board.id, principal.id),
        )
        .await?;
        if assigned {
            Ok((board, AccessLevel::Delegated))
        } else {
            debug!(board_id = %board.id, user_id = %principal.id, "access denied");
            Err(Forbidden::AccessDenied.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory::MemoryBoardDirectory;
    use crate::models::auth::Role;

    struct Fixture {
        dir: Arc<MemoryBoardDirectory>,
        resolver: OwnershipResolver,
        owner: Principal,
        collaborator: Principal,
        stranger: Principal,
        board: Board,
        column: Column,
        item: Item,
    }

    fn principal(name: &str) -> Principal {
        Principal {
            id: Uuid::now_v7(),
            email: format!("{name}@example.com"),
            role: Role::User,
            display_name: name.to_string(),
        }
    }

    fn fixture() -> Fixture {
        let dir = Arc::new(MemoryBoardDirectory::new());
        let owner = principal("owner");
        let collaborator = principal("collaborator");
        let stranger = principal("stranger");
        let board = dir.add_board(owner.id, "Roadmap");
        let column = dir.add_column(board.id);
        let item = dir.add_item(column.id);
        dir.assign(item.id, collaborator.id);
        let resolver = OwnershipResolver::new(dir.clone(), Duration::from_secs(5));
        Fixture {
            dir,
            resolver,
            owner,
            collaborator,
            stranger,
            board,
            column,
            item,
        }
    }

    #[tokio::test]
    async fn owner_passes_both_checks_at_every_level() {
        let f = fixture();
        for resource in [
            ResourceRef::Board(f.board.id),
            ResourceRef::Column(f.column.id),
            ResourceRef::Item(f.item.id),
        ] {
            assert_eq!(f.resolver.require_ownership(resource, &f.owner).await.unwrap(), f.board);
            assert_eq!(f.resolver.require_access(resource, &f.owner).await.unwrap(), f.board);
        }
    }

    #[tokio::test]
    async fn collaborator_has_access_but_not_ownership() {
        let f = fixture();
        let resource = ResourceRef::Item(f.item.id);
        let err = f
            .resolver
            .require_ownership(resource, &f.collaborator)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(Forbidden::AccessDenied)));
        let board = f.resolver.require_access(resource, &f.collaborator).await.unwrap();
        assert_eq!(board.id, f.board.id);
    }

    #[tokio::test]
    async fn collaborator_access_extends_to_the_whole_board() {
        let f = fixture();
        let other_column = f.dir.add_column(f.board.id);
        let (_, level) = f
            .resolver
            .access_level(ResourceRef::Column(other_column.id), &f.collaborator)
            .await
            .unwrap();
        assert_eq!(level, AccessLevel::Delegated);
    }

    #[tokio::test]
    async fn stranger_fails_both_checks() {
        let f = fixture();
        let resource = ResourceRef::Column(f.column.id);
        assert!(matches!(
            f.resolver.require_ownership(resource, &f.stranger).await,
            Err(AuthError::Forbidden(Forbidden::AccessDenied))
        ));
        assert!(matches!(
            f.resolver.require_access(resource, &f.stranger).await,
            Err(AuthError::Forbidden(Forbidden::AccessDenied))
        ));
    }

    #[tokio::test]
    async fn access_level_distinguishes_owner_and_delegate() {
        let f = fixture();
        let resource = ResourceRef::Board(f.board.id);
        let (_, owner_level) = f.resolver.access_level(resource, &f.owner).await.unwrap();
        let (_, collab_level) = f.resolver.access_level(resource, &f.collaborator).await.unwrap();
        assert_eq!(owner_level, AccessLevel::Owner);
        assert_eq!(collab_level, AccessLevel::Delegated);
    }

    #[tokio::test]
    async fn missing_item_is_reported_as_item_not_found() {
        let f = fixture();
        let err = f
            .resolver
            .require_ownership(ResourceRef::Item(Uuid::now_v7()), &f.owner)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotFound(Hop::Item)));
        assert_eq!(err.to_string(), "Item not found");
    }

    #[tokio::test]
    async fn deleted_column_is_reported_for_its_items() {
        let f = fixture();
        f.dir.remove_column(f.column.id);
        let err = f
            .resolver
            .require_access(ResourceRef::Item(f.item.id), &f.stranger)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotFound(Hop::Column)));
    }

    #[tokio::test]
    async fn deleted_board_is_reported_for_its_columns() {
        let f = fixture();
        f.dir.remove_board(f.board.id);
        let err = f
            .resolver
            .require_ownership(ResourceRef::Column(f.column.id), &f.owner)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotFound(Hop::Board)));
    }

    #[test]
    fn resource_kinds_parse() {
        let id = Uuid::now_v7();
        assert_eq!(ResourceRef::parse("board", id), Some(ResourceRef::Board(id)));
        assert_eq!(ResourceRef::parse("columns", id), Some(ResourceRef::Column(id)));
        assert_eq!(ResourceRef::parse("item", id), Some(ResourceRef::Item(id)));
        assert_eq!(ResourceRef::parse("tag", id), None);
    }
}
