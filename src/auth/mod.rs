pub mod password;
pub mod reset_token;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub use password::{hash_password, verify_password, PasswordError};
pub use reset_token::{hash_reset_token, ResetCredential};

/// JWT payload. `iat` is what stale-token checks compare against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub name: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(id: &str, name: &str, email: &str, expiry_hours: u64) -> Self {
        Self::issued_at(id, name, email, Utc::now(), expiry_hours)
    }

    pub fn issued_at(id: &str, name: &str, email: &str, now: DateTime<Utc>, expiry_hours: u64) -> Self {
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,

    #[error("Malformed token: {0}")]
    Malformed(String),

    #[error("JWT generation error: {0}")]
    Signing(String),

    #[error("JWT secret not configured")]
    MissingSecret,
}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key).map_err(|e| TokenError::Signing(e.to_string()))
}

/// Checks signature and expiry, returning the verified payload.
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, TokenError> {
    if secret.is_empty() {
        return Err(TokenError::MissingSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed(e.to_string()),
        })
}

/// True when the password was changed after a token issued at `issued_at` (unix seconds).
pub fn changed_password_after(password_changed_at: Option<DateTime<Utc>>, issued_at: i64) -> bool {
    match (password_changed_at, DateTime::<Utc>::from_timestamp(issued_at, 0)) {
        (Some(changed_at), Some(issued)) => changed_at > issued,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Timestamp recorded for a password change made at `now`.
///
/// Backdated by one second: token `iat` is truncated to whole seconds, and a token
/// minted right after the change must not count as older than it.
pub fn password_changed_timestamp(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::seconds(1)
}
