// handlers/users/login.rs - POST /users/login

use axum::extract::State;

use crate::app::AppState;
use crate::auth::verify_password;
use crate::database::models::PublicUser;
use crate::error::{AppError, ErrorCode};
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::validation::{validate_email, validate_password, CredentialContext};

use super::{issue_token, trimmed, LoginBody};

/**
 * POST /users/login - exchange email and password for a session token
 *
 * Unknown email and wrong password produce the same 401 so the response
 * does not reveal which accounts exist.
 *
 * Response: `{ "status": "success", "user": { ... }, "token": "eyJ..." }`
 */
pub async fn login(State(state): State<AppState>, ApiJson(body): ApiJson<LoginBody>) -> ApiResult<PublicUser> {
    let email = trimmed(&body.email);
    let password = body.password.as_deref();

    validate_email(email, CredentialContext::Login)?;
    validate_password(password, CredentialContext::Login)?;

    let rejected = || AppError::unauthorized(ErrorCode::InvalidEmailOrPassword, "Invalid email or password");

    let Some(user) = state.users.find_by_email(email.unwrap_or_default()).await? else {
        tracing::debug!("Login for unknown email");
        return Err(rejected().into());
    };

    if !verify_password(password.unwrap_or_default(), &user.password_hash).await? {
        tracing::debug!("Login with wrong password for user {}", user.id);
        return Err(rejected().into());
    }

    let token = issue_token(&state, &user)?;
    Ok(ApiResponse::user(user.to_public()).with_token(token))
}
