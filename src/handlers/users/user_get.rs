// handlers/users/user_get.rs - GET /users and GET /users/:id

use axum::{
    extract::{Path, State},
    Extension,
};

use crate::app::AppState;
use crate::database::models::PublicUser;
use crate::database::{ListOptions, ListQuery, UserSortField};
use crate::middleware::{ApiQuery, ApiResponse, ApiResult, Principal};

use super::{own_user_id, user_not_found};

/// GET /users - every account, public fields only.
/// Accepts `pageNumber`, `pageSize`, `sort` (name|email|createdAt|updatedAt) and `direction`.
pub async fn user_list(State(state): State<AppState>, ApiQuery(query): ApiQuery<ListQuery>) -> ApiResult<Vec<PublicUser>> {
    let options = ListOptions::<UserSortField>::from_query(&query, &state.config.pagination);
    let users = state.users.list(options).await?;
    Ok(ApiResponse::success(users.iter().map(|u| u.to_public()).collect()))
}

/// GET /users/:id
pub async fn user_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<PublicUser> {
    let id = own_user_id(&id, &principal)?;
    let user = state.users.find_by_id(id).await?.ok_or_else(|| user_not_found(id))?;
    Ok(ApiResponse::success(user.to_public()))
}
