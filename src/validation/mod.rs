//! Request input checks.
//!
//! Every check is a pure function returning a [`ValidationOutcome`]. Handlers chain
//! them with `?`, so the first failing check is the one reported.

use axum::http::StatusCode;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{AppError, ErrorCode, FieldErrors};

pub const ID_LENGTH: usize = 24;
pub const NAME_MIN_LENGTH: usize = 2;
pub const NAME_MAX_LENGTH: usize = 50;
pub const PASSWORD_MIN_LENGTH: usize = 7;
/// Hex length of a sha-256 digest; reset tokens are issued at this size.
pub const RESET_TOKEN_LENGTH: usize = 64;

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));

/// A failed check: message, offending fields and the code clients branch on.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationFailure {
    pub message: String,
    pub field_errors: FieldErrors,
    pub code: ErrorCode,
}

impl ValidationFailure {
    fn new(code: ErrorCode, message: impl Into<String>, field: &str, value: Value) -> Self {
        let mut field_errors = FieldErrors::new();
        field_errors.insert(field.to_string(), value);
        Self {
            message: message.into(),
            field_errors,
            code,
        }
    }
}

impl From<ValidationFailure> for AppError {
    fn from(failure: ValidationFailure) -> Self {
        AppError {
            status: StatusCode::BAD_REQUEST,
            message: failure.message,
            field_errors: failure.field_errors,
            code: failure.code,
        }
    }
}

pub type ValidationOutcome<T = ()> = Result<T, ValidationFailure>;

/// Which flow a credential check runs in.
///
/// Login-style flows share one code for email and password failures so a caller
/// cannot tell which of the two was wrong. Flows that set a credential report
/// each field separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialContext {
    Login,
    Registration,
}

impl CredentialContext {
    fn email_code(self) -> ErrorCode {
        match self {
            CredentialContext::Login => ErrorCode::InvalidEmailOrPassword,
            CredentialContext::Registration => ErrorCode::InvalidEmail,
        }
    }

    fn password_code(self) -> ErrorCode {
        match self {
            CredentialContext::Login => ErrorCode::InvalidEmailOrPassword,
            CredentialContext::Registration => ErrorCode::InvalidPassword,
        }
    }
}

fn text_or_null(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |v| Value::String(v.to_string()))
}

pub fn validate_id(id: &str) -> ValidationOutcome {
    let fail = |message: &str| ValidationFailure::new(ErrorCode::InvalidId, message, "id", Value::String(id.to_string()));

    if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(fail("\"id\" must only contain alpha-numeric characters"));
    }
    if id.len() != ID_LENGTH {
        return Err(fail(&format!("\"id\" length must be {} characters long", ID_LENGTH)));
    }
    Ok(())
}

/// Accepts RFC 3339 timestamps, `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM:SS` (read as UTC)
/// and numbers of milliseconds since the epoch.
pub fn validate_date(field: &str, value: Option<&Value>) -> ValidationOutcome<DateTime<Utc>> {
    let value = value.filter(|v| !v.is_null());
    let Some(raw) = value else {
        return Err(ValidationFailure::new(
            ErrorCode::InvalidDate,
            format!("\"{}\" is required", field),
            field,
            Value::Null,
        ));
    };

    parse_date(raw).ok_or_else(|| {
        ValidationFailure::new(
            ErrorCode::InvalidDate,
            format!("\"{}\" must be a valid date", field),
            field,
            raw.clone(),
        )
    })
}

fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(Utc.from_utc_datetime(&naive));
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

pub fn validate_name(name: Option<&str>) -> ValidationOutcome {
    let Some(text) = name else {
        return Err(ValidationFailure::new(ErrorCode::InvalidName, "\"name\" is required", "name", Value::Null));
    };

    let length = text.chars().count();
    let message = if length < NAME_MIN_LENGTH {
        format!("\"name\" length must be at least {} characters long", NAME_MIN_LENGTH)
    } else if length > NAME_MAX_LENGTH {
        format!("\"name\" length must be less than or equal to {} characters long", NAME_MAX_LENGTH)
    } else {
        return Ok(());
    };
    Err(ValidationFailure::new(ErrorCode::InvalidName, message, "name", text_or_null(name)))
}

pub fn validate_email(email: Option<&str>, context: CredentialContext) -> ValidationOutcome {
    match email {
        Some(text) if EMAIL.is_match(text) => Ok(()),
        Some(_) => Err(ValidationFailure::new(
            context.email_code(),
            "\"email\" must be a valid email",
            "email",
            text_or_null(email),
        )),
        None => Err(ValidationFailure::new(context.email_code(), "\"email\" is required", "email", Value::Null)),
    }
}

// Password values are never echoed back in field errors.
pub fn validate_password(password: Option<&str>, context: CredentialContext) -> ValidationOutcome {
    let message = match password {
        None => "\"password\" is required".to_string(),
        Some(text) if text.chars().count() < PASSWORD_MIN_LENGTH => {
            format!("\"password\" length must be at least {} characters long", PASSWORD_MIN_LENGTH)
        }
        Some(_) => return Ok(()),
    };
    Err(ValidationFailure::new(context.password_code(), message, "password", Value::Null))
}

pub fn validate_password_confirm(
    password: Option<&str>,
    confirm: Option<&str>,
    context: CredentialContext,
) -> ValidationOutcome {
    validate_password(password, context)?;
    if password != confirm {
        return Err(ValidationFailure::new(
            ErrorCode::PasswordConfirmationError,
            "\"passwordConfirm\" must match \"password\"",
            "passwordConfirm",
            Value::Null,
        ));
    }
    Ok(())
}

pub fn validate_reset_token(token: Option<&str>) -> ValidationOutcome {
    match token {
        Some(text) if text.len() == RESET_TOKEN_LENGTH && text.chars().all(|c| c.is_ascii_hexdigit()) => Ok(()),
        _ => Err(ValidationFailure::new(
            ErrorCode::InvalidResetToken,
            format!("\"resetToken\" must be a {} character hex string", RESET_TOKEN_LENGTH),
            "resetToken",
            text_or_null(token),
        )),
    }
}
