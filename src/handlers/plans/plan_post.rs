// handlers/plans/plan_post.rs - POST /plans

use axum::{extract::State, Extension};

use crate::app::AppState;
use crate::database::models::{NewPlan, Plan};
use crate::middleware::{ApiJson, ApiResponse, ApiResult, Principal};

use super::PlanBody;

/// POST /plans - create a plan owned by the caller. `active` defaults to true.
pub async fn plan_post(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(body): ApiJson<PlanBody>,
) -> ApiResult<Plan> {
    let fields = body.validate()?;

    let plan = state
        .plans
        .insert(NewPlan {
            name: fields.name,
            start_date: fields.start_date,
            end_date: fields.end_date,
            active: fields.active.unwrap_or(true),
            user_id: principal.id,
        })
        .await?;

    Ok(ApiResponse::success(plan))
}
