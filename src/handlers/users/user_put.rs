// handlers/users/user_put.rs - PUT /users/:id

use axum::{
    extract::{Path, State},
    Extension,
};
use chrono::Utc;

use crate::app::AppState;
use crate::auth::{hash_password, password_changed_timestamp};
use crate::database::models::{PublicUser, UserChanges};
use crate::error::{AppError, ErrorCode};
use crate::middleware::{ApiJson, ApiResponse, ApiResult, Principal};
use crate::validation::{validate_email, validate_name, validate_password, CredentialContext};

use super::{issue_token, own_user_id, trimmed, user_not_found, UserBody};

/// PUT /users/:id - replace name and email, optionally the password.
///
/// Only `name`, `email` and `password` are read from the body. A new password
/// stamps the change time, so sessions issued before it stop working; the
/// response carries a fresh token either way.
pub async fn user_put(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<UserBody>,
) -> ApiResult<PublicUser> {
    let id = own_user_id(&id, &principal)?;

    let name = trimmed(&body.name);
    let email = trimmed(&body.email);
    validate_name(name)?;
    validate_email(email, CredentialContext::Registration)?;
    if body.password.is_some() {
        validate_password(body.password.as_deref(), CredentialContext::Registration)?;
    }
    let (name, email) = (name.unwrap_or_default(), email.unwrap_or_default());

    if let Some(other) = state.users.find_by_email(email).await? {
        if other.id != id {
            return Err(AppError::bad_request(ErrorCode::UserAlreadyExists, "There is already a user with this email")
                .with_field("email", email)
                .into());
        }
    }

    let mut changes = UserChanges {
        name: name.to_string(),
        email: email.to_string(),
        password_hash: None,
        password_changed_at: None,
    };
    if let Some(password) = body.password.as_deref() {
        changes.password_hash = Some(hash_password(password, state.config.security.bcrypt_cost).await?);
        changes.password_changed_at = Some(password_changed_timestamp(Utc::now()));
    }

    let user = state
        .users
        .update_profile(id, changes)
        .await?
        .ok_or_else(|| user_not_found(id))?;

    let token = issue_token(&state, &user)?;
    Ok(ApiResponse::success(user.to_public()).with_token(token))
}
