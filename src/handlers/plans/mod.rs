// handlers/plans/mod.rs - Plan handlers
//
// All routes are protected and scoped to the calling user: a plan owned by
// someone else answers exactly like one that does not exist.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, ErrorCode};
use crate::validation::{validate_date, validate_name, ValidationOutcome};

pub mod plan_delete;
pub mod plan_get;
pub mod plan_post;
pub mod plan_put;

pub use plan_delete::plan_delete;
pub use plan_get::{plan_get, plan_list};
pub use plan_post::plan_post;
pub use plan_put::plan_put;

/// Body of create and replace. Dates stay raw until validated.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanBody {
    pub name: Option<String>,
    pub start_date: Option<Value>,
    pub end_date: Option<Value>,
    pub active: Option<bool>,
}

/// The validated fields of a [`PlanBody`]
#[derive(Debug)]
pub(crate) struct PlanFields {
    pub name: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub active: Option<bool>,
}

impl PlanBody {
    pub(crate) fn validate(&self) -> ValidationOutcome<PlanFields> {
        let name = self.name.as_deref().map(str::trim);
        validate_name(name)?;
        let start_date = validate_date("startDate", self.start_date.as_ref())?;
        let end_date = validate_date("endDate", self.end_date.as_ref())?;

        Ok(PlanFields {
            name: name.unwrap_or_default().to_string(),
            start_date,
            end_date,
            active: self.active,
        })
    }
}

pub(crate) fn plan_not_found(id: &str) -> AppError {
    AppError::not_found(ErrorCode::PlanNotFound, "Plan not found").with_field("id", id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> PlanBody {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn validates_in_order() {
        let err = body(json!({ "startDate": "2024-01-01" })).validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidName);

        let err = body(json!({ "name": "Budget", "endDate": "2024-01-01" })).validate().unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidDate);
        assert!(err.field_errors.contains_key("startDate"));

        let err = body(json!({ "name": "Budget", "startDate": "2024-01-01", "endDate": "soon" }))
            .validate()
            .unwrap_err();
        assert!(err.field_errors.contains_key("endDate"));
    }

    #[test]
    fn trims_name() {
        let fields = body(json!({ "name": "  Budget ", "startDate": "2024-01-01", "endDate": "2024-02-01" }))
            .validate()
            .unwrap();
        assert_eq!(fields.name, "Budget");
        assert_eq!(fields.active, None);
    }
}
