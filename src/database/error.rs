use serde_json::Value;
use sqlx::postgres::PgDatabaseError;
use thiserror::Error;

/// Persistence failures, classified so the normalizer can report them precisely.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique constraint violation. Carries the store's own description,
    /// e.g. `Key (email)=(ann@x.com) already exists.`
    #[error("Duplicate key: {0}")]
    Duplicate(String),

    /// A stored-value constraint rejected the write; reports the first failing field.
    #[error("Validation failed for {field}: {message}")]
    Validation { field: String, value: Value, message: String },

    /// A value could not be converted to the column's type.
    #[error("Cannot cast {value} for {field}")]
    Cast { field: String, value: Value },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

// SQLSTATE codes the store classifies.
const UNIQUE_VIOLATION: &str = "23505";
const CHECK_VIOLATION: &str = "23514";
const NOT_NULL_VIOLATION: &str = "23502";
const INVALID_TEXT_REPRESENTATION: &str = "22P02";
const INVALID_DATETIME_FORMAT: &str = "22007";
const DATETIME_FIELD_OVERFLOW: &str = "22008";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let pg = db.try_downcast_ref::<PgDatabaseError>();
            match db.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    let detail = pg.and_then(|pg| pg.detail()).unwrap_or_else(|| db.message());
                    return StoreError::Duplicate(detail.to_string());
                }
                Some(CHECK_VIOLATION) | Some(NOT_NULL_VIOLATION) => {
                    let field = pg
                        .and_then(|pg| pg.column())
                        .map(str::to_string)
                        .or_else(|| db.constraint().map(constraint_field))
                        .unwrap_or_else(|| "unknown".to_string());
                    return StoreError::Validation {
                        message: format!("'{}' failed validation", field),
                        field,
                        value: Value::Null,
                    };
                }
                Some(INVALID_TEXT_REPRESENTATION) | Some(INVALID_DATETIME_FORMAT) | Some(DATETIME_FIELD_OVERFLOW) => {
                    let field = pg.and_then(|pg| pg.column()).unwrap_or("value").to_string();
                    return StoreError::Cast { field, value: Value::Null };
                }
                _ => {}
            }
        }

        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            other => StoreError::Sqlx(other),
        }
    }
}

/// Constraints are named `<table>_<field>_<rule>`.
fn constraint_field(constraint: &str) -> String {
    constraint.split('_').nth(1).unwrap_or(constraint).to_string()
}
