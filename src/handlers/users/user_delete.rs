// handlers/users/user_delete.rs - DELETE /users/:id

use axum::{
    extract::{Path, State},
    Extension,
};

use crate::app::AppState;
use crate::database::models::PublicUser;
use crate::middleware::{ApiResponse, ApiResult, Principal};

use super::{own_user_id, user_not_found};

/// DELETE /users/:id - close the caller's own account. Their plans go with it.
pub async fn user_delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<PublicUser> {
    let id = own_user_id(&id, &principal)?;
    let user = state.users.delete(id).await?.ok_or_else(|| user_not_found(id))?;
    tracing::info!("Deleted user {}", user.id);
    Ok(ApiResponse::success(user.to_public()))
}
