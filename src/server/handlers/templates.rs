use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use crate::database::entities::{step_templates, StepCategory, StepType};
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::services::{NewTemplate, TemplateDeletion, TemplateUpdate};

#[derive(Deserialize)]
pub struct AddTemplateRequest {
    pub category: StepCategory,
    pub name: String,
    pub step_type: StepType,
    #[serde(default)]
    pub content: String,
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct ReorderRequest {
    pub release_id: i32,
    pub category: StepCategory,
    pub ordered_ids: Vec<i32>,
}

pub async fn list_templates(
    State(state): State<AppState>,
    Path(release_id): Path<i32>,
) -> ApiResult<Json<Vec<step_templates::Model>>> {
    Ok(Json(state.templates.list_templates(release_id).await?))
}

pub async fn add_template(
    State(state): State<AppState>,
    Path(release_id): Path<i32>,
    Json(payload): Json<AddTemplateRequest>,
) -> ApiResult<(StatusCode, Json<step_templates::Model>)> {
    let template = state
        .templates
        .add_template(NewTemplate {
            release_id,
            category: payload.category,
            name: payload.name,
            step_type: payload.step_type,
            content: payload.content,
            description: payload.description,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(template)))
}

pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<TemplateUpdate>,
) -> ApiResult<Json<step_templates::Model>> {
    Ok(Json(state.templates.update_template(id, payload).await?))
}

pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<TemplateDeletion>> {
    Ok(Json(state.templates.delete_template(id).await?))
}

pub async fn reorder_steps(
    State(state): State<AppState>,
    Json(payload): Json<ReorderRequest>,
) -> ApiResult<Json<Vec<step_templates::Model>>> {
    Ok(Json(
        state
            .templates
            .reorder_templates(payload.release_id, payload.category, payload.ordered_ids)
            .await?,
    ))
}
