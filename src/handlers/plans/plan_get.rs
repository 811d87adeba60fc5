// handlers/plans/plan_get.rs - GET /plans and GET /plans/:id

use axum::{
    extract::{Path, State},
    Extension,
};

use crate::app::AppState;
use crate::database::models::Plan;
use crate::database::{ListOptions, ListQuery, PlanSortField};
use crate::middleware::{ApiQuery, ApiResponse, ApiResult, Principal};
use crate::validation::validate_id;

use super::plan_not_found;

/// GET /plans - the caller's plans, newest start date first unless sorted otherwise.
pub async fn plan_list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<Vec<Plan>> {
    let options = ListOptions::<PlanSortField>::from_query(&query, &state.config.pagination);
    let plans = state.plans.list_owned(&principal.id, options).await?;
    Ok(ApiResponse::success(plans))
}

/// GET /plans/:id
pub async fn plan_get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Plan> {
    validate_id(&id)?;
    let plan = state
        .plans
        .find_owned(&id, &principal.id)
        .await?
        .ok_or_else(|| plan_not_found(&id))?;
    Ok(ApiResponse::success(plan))
}
