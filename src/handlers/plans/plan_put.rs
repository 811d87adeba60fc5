// handlers/plans/plan_put.rs - PUT /plans/:id

use axum::{
    extract::{Path, State},
    Extension,
};

use crate::app::AppState;
use crate::database::models::{Plan, PlanChanges};
use crate::middleware::{ApiJson, ApiResponse, ApiResult, Principal};
use crate::validation::validate_id;

use super::{plan_not_found, PlanBody};

/// PUT /plans/:id - replace `name`, `startDate`, `endDate` and optionally `active`.
/// Ownership and any other member of the body are ignored.
pub async fn plan_put(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<PlanBody>,
) -> ApiResult<Plan> {
    validate_id(&id)?;
    let fields = body.validate()?;

    let changes = PlanChanges {
        name: fields.name,
        start_date: fields.start_date,
        end_date: fields.end_date,
        active: fields.active,
    };
    let plan = state
        .plans
        .update_owned(&id, &principal.id, changes)
        .await?
        .ok_or_else(|| plan_not_found(&id))?;
    Ok(ApiResponse::success(plan))
}
