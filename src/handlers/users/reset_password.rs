// handlers/users/reset_password.rs - POST /users/reset-password

use axum::extract::State;
use chrono::Utc;

use crate::app::AppState;
use crate::auth::{hash_password, hash_reset_token, password_changed_timestamp};
use crate::database::models::{PasswordReset, PublicUser};
use crate::error::{AppError, ErrorCode};
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::validation::{validate_password_confirm, validate_reset_token, CredentialContext};

use super::{issue_token, ResetPasswordBody};

/// POST /users/reset-password - redeem a reset token for a new password.
///
/// Success consumes the token, records the password change (which invalidates
/// every earlier session token) and answers with a fresh session token.
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ResetPasswordBody>,
) -> ApiResult<PublicUser> {
    let reset_token = body.reset_token.as_deref();
    let password = body.password.as_deref();

    validate_reset_token(reset_token)?;
    validate_password_confirm(password, body.password_confirm.as_deref(), CredentialContext::Registration)?;

    let reset_token = reset_token.unwrap_or_default();
    let expired = || {
        AppError::bad_request(ErrorCode::ResetTokenExpired, "User not found or token has expired")
            .with_field("resetToken", reset_token)
    };

    let token_hash = hash_reset_token(reset_token);
    let now = Utc::now();
    match state.users.find_by_reset_token_hash(&token_hash).await? {
        Some(user) if user.reset_credential().is_valid(now) => {}
        _ => return Err(expired().into()),
    }

    let password_hash = hash_password(password.unwrap_or_default(), state.config.security.bcrypt_cost).await?;
    let reset = PasswordReset {
        token_hash,
        password_hash,
        password_changed_at: password_changed_timestamp(Utc::now()),
    };

    // Re-checked in the same write: a concurrent reset may have consumed it.
    let Some(user) = state.users.consume_reset_token(reset, Utc::now()).await? else {
        return Err(expired().into());
    };

    tracing::info!("Password reset completed for user {}", user.id);
    let token = issue_token(&state, &user)?;
    Ok(ApiResponse::success(user.to_public()).with_token(token))
}
