use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use crate::database::entities::{releases, StepCategory};
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::services::{
    ActivationOutcome, ClusterMatrix, ClusterSteps, CustomerStepGroup, ReleaseInput,
    ReleaseStats, ReleaseUpdate, ReleaseWithTemplates, StepStats,
};

#[derive(Deserialize, Default)]
pub struct ActivateRequest {
    pub customer_ids: Option<Vec<i32>>,
}

#[derive(Deserialize)]
pub struct AddCustomersRequest {
    pub customer_ids: Vec<i32>,
}

#[derive(Deserialize)]
pub struct CloneRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct MatrixQuery {
    pub category: Option<StepCategory>,
}

pub async fn list_releases(State(state): State<AppState>) -> ApiResult<Json<Vec<releases::Model>>> {
    Ok(Json(state.releases.list_releases().await?))
}

pub async fn active_releases(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<releases::Model>>> {
    Ok(Json(state.releases.get_active_releases().await?))
}

pub async fn release_stats(State(state): State<AppState>) -> ApiResult<Json<ReleaseStats>> {
    Ok(Json(state.releases.get_release_stats().await?))
}

pub async fn create_release(
    State(state): State<AppState>,
    Json(payload): Json<ReleaseInput>,
) -> ApiResult<(StatusCode, Json<releases::Model>)> {
    let release = state.releases.create_release(payload).await?;
    Ok((StatusCode::CREATED, Json(release)))
}

pub async fn get_release(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<ReleaseWithTemplates>> {
    Ok(Json(state.releases.get_release_with_templates(id).await?))
}

pub async fn update_release(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<ReleaseUpdate>,
) -> ApiResult<Json<releases::Model>> {
    Ok(Json(state.releases.update_release(id, payload).await?))
}

pub async fn delete_release(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    state.releases.delete_release(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Body is optional; an empty body targets every active customer.
pub async fn activate_release(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    payload: Option<Json<ActivateRequest>>,
) -> ApiResult<Json<ActivationOutcome>> {
    let Json(request) = payload.unwrap_or_default();
    Ok(Json(
        state
            .activation
            .activate_release(id, request.customer_ids)
            .await?,
    ))
}

pub async fn add_customers(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<AddCustomersRequest>,
) -> ApiResult<Json<ActivationOutcome>> {
    Ok(Json(
        state
            .activation
            .add_customers_to_release(id, payload.customer_ids)
            .await?,
    ))
}

pub async fn archive_release(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<releases::Model>> {
    Ok(Json(state.releases.archive_release(id).await?))
}

pub async fn clone_release(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<CloneRequest>,
) -> ApiResult<(StatusCode, Json<releases::Model>)> {
    let cloned = state.releases.clone_release(id, &payload.name).await?;
    Ok((StatusCode::CREATED, Json(cloned)))
}

pub async fn step_stats(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<StepStats>> {
    Ok(Json(state.steps.get_step_stats(id).await?))
}

pub async fn steps_grouped_by_cluster(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Vec<ClusterSteps>>> {
    Ok(Json(
        state.matrix.get_release_steps_grouped_by_cluster(id).await?,
    ))
}

pub async fn steps_by_customer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Vec<CustomerStepGroup>>> {
    Ok(Json(state.matrix.get_release_steps_by_customer(id).await?))
}

pub async fn matrix(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<MatrixQuery>,
) -> ApiResult<Json<Vec<ClusterMatrix>>> {
    let category = query.category.unwrap_or(StepCategory::Deploy);
    Ok(Json(state.matrix.build_matrix(id, category).await?))
}
