// HTTP API error types and the response normalizer
use axum::{http::StatusCode, response::IntoResponse, Json};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::auth::{PasswordError, TokenError};
use crate::database::StoreError;
use crate::validation::ValidationFailure;

/// Field name -> offending value, as reported in the `errors` member of a failure.
pub type FieldErrors = Map<String, Value>;

/// Symbolic error codes understood by API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidId,
    InvalidDate,
    InvalidName,
    InvalidEmailOrPassword,
    InvalidEmail,
    InvalidPassword,
    PasswordConfirmationError,
    InvalidResetToken,
    ResetTokenExpired,
    InvalidOrExpiredToken,
    UserAlreadyExists,
    UserNotFound,
    PlanNotFound,
    DuplicateKey,
    SchemaValidationError,
    FailedToLoadData,
    FailedToSendEmail,
    InvalidRequestBody,
    RouteNotFound,
    InternalServerError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidId => "INVALID_ID",
            ErrorCode::InvalidDate => "INVALID_DATE",
            ErrorCode::InvalidName => "INVALID_NAME",
            ErrorCode::InvalidEmailOrPassword => "INVALID_EMAIL_OR_PASSWORD",
            ErrorCode::InvalidEmail => "INVALID_EMAIL",
            ErrorCode::InvalidPassword => "INVALID_PASSWORD",
            ErrorCode::PasswordConfirmationError => "PASSWORD_CONFIRMATION_ERROR",
            ErrorCode::InvalidResetToken => "INVALID_RESET_TOKEN",
            ErrorCode::ResetTokenExpired => "RESET_TOKEN_EXPIRED",
            ErrorCode::InvalidOrExpiredToken => "INVALID_OR_EXPIRED_TOKEN",
            ErrorCode::UserAlreadyExists => "USER_ALREADY_EXISTS",
            ErrorCode::UserNotFound => "USER_NOT_FOUND",
            ErrorCode::PlanNotFound => "PLAN_NOT_FOUND",
            ErrorCode::DuplicateKey => "DUPLICATE_KEY",
            ErrorCode::SchemaValidationError => "SCHEMA_VALIDATION_ERROR",
            ErrorCode::FailedToLoadData => "FAILED_TO_LOAD_DATA",
            ErrorCode::FailedToSendEmail => "FAILED_TO_SEND_EMAIL",
            ErrorCode::InvalidRequestBody => "INVALID_REQUEST_BODY",
            ErrorCode::RouteNotFound => "ROUTE_NOT_FOUND",
            ErrorCode::InternalServerError => "INTERNAL_SERVER_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully classified failure: exactly what the client will see.
#[derive(Debug, Clone, PartialEq)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub field_errors: FieldErrors,
    pub code: ErrorCode,
}

// Static constructor methods
impl AppError {
    pub fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            field_errors: FieldErrors::new(),
            code,
        }
    }

    pub fn bad_request(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message)
    }

    pub fn unauthorized(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, code, message)
    }

    pub fn not_found(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    pub fn internal(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, message)
    }

    /// The one rejection the authorization gate ever reports.
    pub fn invalid_token(token: Option<&str>) -> Self {
        Self::unauthorized(ErrorCode::InvalidOrExpiredToken, "Invalid or expired token")
            .with_field("token", token.map_or(Value::Null, |t| Value::String(t.to_string())))
    }

    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.field_errors.insert(field.into(), value.into());
        self
    }

    /// Wire shape shared by every non-2xx response.
    pub fn to_json(&self) -> Value {
        json!({
            "status": "fail",
            "message": self.message,
            "errors": self.field_errors,
            "errorCode": self.code,
        })
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.to_json())).into_response()
    }
}

/// Everything a handler can fail with. Converted to a response exactly once.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationFailure> for ApiError {
    fn from(failure: ValidationFailure) -> Self {
        ApiError::App(failure.into())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(anyhow::Error::new(err))
    }
}

const INTERNAL_MESSAGE: &str = "Internal server error";

impl ApiError {
    /// Classify into the single client-facing shape. Internal detail is logged here
    /// and never leaves the process.
    pub fn normalize(self) -> AppError {
        match self {
            ApiError::App(err) => err,
            ApiError::Store(StoreError::Duplicate(detail)) => {
                let (field, value) = duplicate_key_details(&detail);
                let err = AppError::bad_request(
                    ErrorCode::DuplicateKey,
                    format!("Duplicate field value: \"{}\". Please use another value", value),
                );
                match field {
                    Some(field) => err.with_field(field, value),
                    None => err,
                }
            }
            ApiError::Store(StoreError::Validation { field, value, message }) => {
                AppError::bad_request(ErrorCode::SchemaValidationError, message).with_field(field, value)
            }
            ApiError::Store(StoreError::Cast { field, value }) => {
                AppError::bad_request(ErrorCode::FailedToLoadData, "Failed to load data").with_field(field, value)
            }
            ApiError::Store(err @ (StoreError::Unavailable(_) | StoreError::Sqlx(_))) => {
                tracing::error!("Store error: {}", err);
                AppError::internal(ErrorCode::InternalServerError, INTERNAL_MESSAGE)
            }
            ApiError::Token(err @ (TokenError::Expired | TokenError::Malformed(_))) => {
                tracing::debug!("Token rejected: {}", err);
                AppError::invalid_token(None)
            }
            ApiError::Token(err @ (TokenError::Signing(_) | TokenError::MissingSecret)) => {
                tracing::error!("Token signing error: {}", err);
                AppError::internal(ErrorCode::InternalServerError, INTERNAL_MESSAGE)
            }
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {:?}", err);
                AppError::internal(ErrorCode::InternalServerError, INTERNAL_MESSAGE)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        self.normalize().into_response()
    }
}

static KEY_DETAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Key \((?P<field>[^)]+)\)=\((?P<value>.*)\)").expect("valid key detail pattern"));

static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""([^"]*)"|'([^']*)'"#).expect("valid quoted pattern"));

/// Pulls the offending field and the bare value out of a uniqueness violation message.
///
/// Understands the `Key (field)=(value)` detail the stores produce and falls back to
/// the first quoted fragment of anything else.
fn duplicate_key_details(detail: &str) -> (Option<String>, String) {
    if let Some(caps) = KEY_DETAIL.captures(detail) {
        return (Some(caps["field"].to_string()), caps["value"].to_string());
    }
    let quoted = QUOTED
        .captures(detail)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string());
    (None, quoted.unwrap_or_default())
}
