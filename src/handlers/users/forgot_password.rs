// handlers/users/forgot_password.rs - POST /users/forgot-password

use axum::extract::State;
use chrono::{Duration, Utc};
use url::Url;

use crate::app::AppState;
use crate::auth::ResetCredential;
use crate::error::{ApiError, AppError, ErrorCode};
use crate::mail::password_reset_message;
use crate::middleware::{ApiJson, ApiResponse, ApiResult};
use crate::validation::{validate_email, CredentialContext};

use super::{trimmed, ForgotPasswordBody};

/// POST /users/forgot-password - issue a reset token and email the link.
///
/// The credential is stored before the email goes out. A failed send is
/// reported as `FAILED_TO_SEND_EMAIL`; the stored token is left in place and
/// simply expires.
pub async fn forgot_password(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ForgotPasswordBody>,
) -> ApiResult<()> {
    let email = trimmed(&body.email);
    validate_email(email, CredentialContext::Login)?;

    let Some(user) = state.users.find_by_email(email.unwrap_or_default()).await? else {
        return Err(AppError::bad_request(ErrorCode::InvalidEmailOrPassword, "Invalid email or user").into());
    };

    let ttl_minutes = state.config.security.reset_token_ttl_minutes;
    let (token, credential) = ResetCredential::issue(Utc::now(), Duration::minutes(ttl_minutes));
    if !state.users.set_reset_credential(&user.id, credential).await? {
        return Err(AppError::bad_request(ErrorCode::InvalidEmailOrPassword, "Invalid email or user").into());
    }

    let link = reset_link(&state.config.mail.reset_url, &token)?;
    let message = password_reset_message(&user.email, link.as_str(), ttl_minutes);

    if let Err(e) = state.mailer.send(message).await {
        tracing::error!("Failed to send password reset email to user {}: {}", user.id, e);
        return Err(AppError::internal(ErrorCode::FailedToSendEmail, "Failed to send email").into());
    }

    tracing::info!("Password reset issued for user {}", user.id);
    Ok(ApiResponse::empty())
}

/// `base` with the token appended as its last path segment.
fn reset_link(base: &str, token: &str) -> Result<Url, ApiError> {
    let mut base = base.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    let url = Url::parse(&base).and_then(|b| b.join(token)).map_err(anyhow::Error::new)?;
    Ok(url)
}
