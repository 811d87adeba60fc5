// handlers/users/mod.rs - User account and session handlers
//
// Public:    POST /users/register, /users/login, /users/forgot-password, /users/reset-password
// Protected: GET/POST /users, GET/PUT/DELETE /users/:id

use serde::Deserialize;

use crate::app::AppState;
use crate::auth::{generate_jwt, Claims};
use crate::database::models::User;
use crate::error::{ApiError, AppError, ErrorCode};
use crate::middleware::Principal;
use crate::validation::validate_id;

pub mod forgot_password;
pub mod login;
pub mod register;
pub mod reset_password;
pub mod user_delete;
pub mod user_get;
pub mod user_put;

pub use forgot_password::forgot_password;
pub use login::login;
pub use register::{register, user_create};
pub use reset_password::reset_password;
pub use user_delete::user_delete;
pub use user_get::{user_get, user_list};
pub use user_put::user_put;

/// Body of register, create and update. Unknown members are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct UserBody {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginBody {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ForgotPasswordBody {
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordBody {
    pub reset_token: Option<String>,
    pub password: Option<String>,
    pub password_confirm: Option<String>,
}

/// Signs a fresh session token for `user`.
pub(crate) fn issue_token(state: &AppState, user: &User) -> Result<String, ApiError> {
    let security = &state.config.security;
    let claims = Claims::new(&user.id, &user.name, &user.email, security.jwt_expiry_hours);
    Ok(generate_jwt(&claims, &security.jwt_secret)?)
}

/// Validates `:id` and confines it to the caller's own account. Another user's
/// id is reported exactly like a missing one.
pub(crate) fn own_user_id<'a>(id: &'a str, principal: &Principal) -> Result<&'a str, ApiError> {
    validate_id(id)?;
    if id != principal.id {
        return Err(user_not_found(id).into());
    }
    Ok(id)
}

pub(crate) fn user_not_found(id: &str) -> AppError {
    AppError::not_found(ErrorCode::UserNotFound, "User not found").with_field("id", id)
}

pub(crate) fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim)
}
