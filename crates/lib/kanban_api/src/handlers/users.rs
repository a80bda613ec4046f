//! User administration handlers.

use axum::Json;
use axum::extract::{Path, State};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::Auth;
use crate::models::{UpdateRoleRequest, UserResponse};

/// `PATCH /users/{id}/role`: change a user's role.
///
/// Mounted behind the `admin` gate; the elevation policy then decides
/// whether this particular change is allowed.
pub async fn update_role_handler(
    State(state): State<AppState>,
    Auth(actor): Auth,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateRoleRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = state.sessions.change_role(&actor, id, body.role).await?;
    Ok(Json(user.into()))
}
