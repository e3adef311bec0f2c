use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use crate::database::entities::clusters;
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::services::{ClusterInput, ClusterUpdate, ClusterWithCustomers};

pub async fn list_clusters(State(state): State<AppState>) -> ApiResult<Json<Vec<clusters::Model>>> {
    Ok(Json(state.clusters.list_clusters().await?))
}

pub async fn create_cluster(
    State(state): State<AppState>,
    Json(payload): Json<ClusterInput>,
) -> ApiResult<(StatusCode, Json<clusters::Model>)> {
    let cluster = state.clusters.create_cluster(payload).await?;
    Ok((StatusCode::CREATED, Json(cluster)))
}

pub async fn get_cluster(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<ClusterWithCustomers>> {
    Ok(Json(state.clusters.get_cluster_with_customers(id).await?))
}

pub async fn update_cluster(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<ClusterUpdate>,
) -> ApiResult<Json<clusters::Model>> {
    Ok(Json(state.clusters.update_cluster(id, payload).await?))
}

pub async fn delete_cluster(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    state.clusters.delete_cluster(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
