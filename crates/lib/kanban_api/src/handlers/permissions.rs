//! Board access probe.

use axum::Json;
use axum::extract::{Path, State};
use kanban_core::auth::ownership::ResourceRef;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::Auth;
use crate::models::AccessResponse;

/// `GET /permissions/{kind}/{id}`: how the caller relates to the board
/// controlling a board, column or item.
pub async fn access_level_handler(
    State(state): State<AppState>,
    Auth(principal): Auth,
    Path((kind, id)): Path<(String, Uuid)>,
) -> AppResult<Json<AccessResponse>> {
    let resource = ResourceRef::parse(&kind, id)
        .ok_or_else(|| AppError::Validation(format!("Unknown resource kind: {kind}")))?;
    let (board, access) = state.resources.access_level(resource, &principal).await?;
    Ok(Json(AccessResponse {
        board_id: board.id,
        access,
    }))
}
