// handlers/users/register.rs - POST /users/register and POST /users

use axum::{extract::State, Extension};

use crate::app::AppState;
use crate::auth::hash_password;
use crate::database::models::{NewUser, PublicUser};
use crate::error::{AppError, ErrorCode};
use crate::middleware::{ApiJson, ApiResponse, ApiResult, Principal};
use crate::validation::{validate_email, validate_name, validate_password, CredentialContext};

use super::{issue_token, trimmed, UserBody};

/// POST /users/register - open sign-up. Answers with the new user and a session token.
pub async fn register(State(state): State<AppState>, ApiJson(body): ApiJson<UserBody>) -> ApiResult<PublicUser> {
    create_user(&state, body).await
}

/// POST /users - the same operation for an already signed-in caller
pub async fn user_create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(body): ApiJson<UserBody>,
) -> ApiResult<PublicUser> {
    tracing::debug!("User {} creating an account", principal.id);
    create_user(&state, body).await
}

async fn create_user(state: &AppState, body: UserBody) -> ApiResult<PublicUser> {
    let name = trimmed(&body.name);
    let email = trimmed(&body.email);
    let password = body.password.as_deref();

    validate_name(name)?;
    validate_email(email, CredentialContext::Registration)?;
    validate_password(password, CredentialContext::Registration)?;

    let (name, email, password) = (name.unwrap_or_default(), email.unwrap_or_default(), password.unwrap_or_default());

    if state.users.find_by_email(email).await?.is_some() {
        return Err(AppError::bad_request(ErrorCode::UserAlreadyExists, "There is already a user with this email")
            .with_field("email", email)
            .into());
    }

    let password_hash = hash_password(password, state.config.security.bcrypt_cost).await?;
    let user = state
        .users
        .insert(NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash,
        })
        .await?;

    tracing::info!("Registered user {}", user.id);
    let token = issue_token(state, &user)?;
    Ok(ApiResponse::success(user.to_public()).with_token(token))
}
