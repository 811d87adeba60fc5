// handlers/plans/plan_delete.rs - DELETE /plans/:id

use axum::{
    extract::{Path, State},
    Extension,
};

use crate::app::AppState;
use crate::database::models::Plan;
use crate::middleware::{ApiResponse, ApiResult, Principal};
use crate::validation::validate_id;

use super::plan_not_found;

/// DELETE /plans/:id - returns the removed plan
pub async fn plan_delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Plan> {
    validate_id(&id)?;
    let plan = state
        .plans
        .delete_owned(&id, &principal.id)
        .await?
        .ok_or_else(|| plan_not_found(&id))?;
    Ok(ApiResponse::success(plan))
}
