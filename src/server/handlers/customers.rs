use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use crate::database::entities::customers;
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::services::{ClusterCustomers, CustomerInput, CustomerUpdate, CustomerWithCluster};

pub async fn list_customers(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CustomerWithCluster>>> {
    Ok(Json(state.customers.list_customers().await?))
}

pub async fn list_customers_by_cluster(
    State(state): State<AppState>,
    Path(cluster_id): Path<i32>,
) -> ApiResult<Json<Vec<customers::Model>>> {
    Ok(Json(state.customers.list_customers_by_cluster(cluster_id).await?))
}

pub async fn customers_grouped_by_cluster(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<ClusterCustomers>>> {
    Ok(Json(state.customers.get_customers_grouped_by_cluster().await?))
}

pub async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CustomerInput>,
) -> ApiResult<(StatusCode, Json<customers::Model>)> {
    let customer = state.customers.create_customer(payload).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<CustomerWithCluster>> {
    Ok(Json(state.customers.get_customer(id).await?))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<CustomerUpdate>,
) -> ApiResult<Json<customers::Model>> {
    Ok(Json(state.customers.update_customer(id, payload).await?))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    state.customers.delete_customer(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
