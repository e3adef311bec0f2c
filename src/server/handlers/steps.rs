use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use crate::database::entities::customer_steps;
use crate::errors::CoreError;
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::services::{
    BulkOutcome, CustomStepInput, CustomStepOutcome, CustomStepUpdate, StepDetails,
};

#[derive(Deserialize, Default)]
pub struct DoneRequest {
    pub notes: Option<String>,
    pub executed_by: Option<String>,
}

#[derive(Deserialize)]
pub struct SkipRequest {
    pub reason: String,
}

#[derive(Deserialize, Default)]
pub struct RevertRequest {
    pub reason: Option<String>,
}

#[derive(Deserialize)]
pub struct OverrideRequest {
    pub content: String,
}

#[derive(Deserialize)]
pub struct BulkDoneRequest {
    pub step_ids: Vec<i32>,
    pub executed_by: Option<String>,
}

pub async fn customer_steps(
    State(state): State<AppState>,
    Path((release_id, customer_id)): Path<(i32, i32)>,
) -> ApiResult<Json<Vec<customer_steps::Model>>> {
    Ok(Json(
        state
            .steps
            .get_customer_steps(release_id, customer_id)
            .await?,
    ))
}

pub async fn get_step(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<customer_steps::Model>> {
    Ok(Json(state.steps.get_step(id).await?))
}

pub async fn step_detail(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<StepDetails>> {
    Ok(Json(state.steps.get_step_with_details(id).await?))
}

pub async fn mark_done(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    payload: Option<Json<DoneRequest>>,
) -> ApiResult<Json<customer_steps::Model>> {
    let Json(request) = payload.unwrap_or_default();
    Ok(Json(
        state
            .steps
            .mark_done(id, request.notes, request.executed_by)
            .await?,
    ))
}

pub async fn skip(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<SkipRequest>,
) -> ApiResult<Json<customer_steps::Model>> {
    if payload.reason.trim().is_empty() {
        return Err(CoreError::validation("A reason is required to skip a step")
            .with_field("step_id", id)
            .into());
    }
    Ok(Json(state.steps.skip(id, payload.reason).await?))
}

pub async fn revert(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    payload: Option<Json<RevertRequest>>,
) -> ApiResult<Json<customer_steps::Model>> {
    let Json(request) = payload.unwrap_or_default();
    Ok(Json(state.steps.revert(id, request.reason).await?))
}

pub async fn override_content(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<OverrideRequest>,
) -> ApiResult<Json<customer_steps::Model>> {
    Ok(Json(state.steps.override_content(id, payload.content).await?))
}

pub async fn reset_to_template(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<customer_steps::Model>> {
    Ok(Json(state.steps.reset_to_template(id).await?))
}

pub async fn add_custom_step(
    State(state): State<AppState>,
    Path((release_id, customer_id)): Path<(i32, i32)>,
    Json(payload): Json<CustomStepInput>,
) -> ApiResult<(StatusCode, Json<CustomStepOutcome>)> {
    let outcome = state
        .steps
        .add_custom_step(release_id, customer_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn edit_custom_step(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<CustomStepUpdate>,
) -> ApiResult<Json<customer_steps::Model>> {
    Ok(Json(state.steps.edit_custom_step(id, payload).await?))
}

pub async fn delete_custom_step(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    state.steps.delete_custom_step(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_mark_done(
    State(state): State<AppState>,
    Json(payload): Json<BulkDoneRequest>,
) -> Json<BulkOutcome> {
    Json(
        state
            .steps
            .bulk_mark_done(payload.step_ids, payload.executed_by)
            .await,
    )
}
