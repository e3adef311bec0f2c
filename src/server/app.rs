use anyhow::Result;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};

use super::auth;
use super::handlers::{clusters, customers, health, releases, steps, templates};
use crate::config::PasscodeConfig;
use crate::services::{
    ActivationService, ClusterService, CustomerService, MatrixService, ReleaseService,
    StepService, TemplateService,
};

#[derive(Clone)]
pub struct AppState {
    pub clusters: ClusterService,
    pub customers: CustomerService,
    pub releases: ReleaseService,
    pub templates: TemplateService,
    pub activation: ActivationService,
    pub steps: StepService,
    pub matrix: MatrixService,
    pub passcode: PasscodeConfig,
}

impl AppState {
    pub fn new(db: DatabaseConnection, passcode: PasscodeConfig) -> Self {
        Self {
            clusters: ClusterService::new(db.clone()),
            customers: CustomerService::new(db.clone()),
            releases: ReleaseService::new(db.clone()),
            templates: TemplateService::new(db.clone()),
            activation: ActivationService::new(db.clone()),
            steps: StepService::new(db.clone()),
            matrix: MatrixService::new(db),
            passcode,
        }
    }
}

pub fn create_app(
    db: DatabaseConnection,
    cors_origin: Option<&str>,
    passcode: PasscodeConfig,
) -> Result<Router> {
    let state = AppState::new(db, passcode);

    let cors = match cors_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<axum::http::HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/auth", post(auth::login).delete(auth::logout))
        .nest("/api/v1", api_v1_routes())
        .layer(from_fn_with_state(state.clone(), auth::require_passcode))
        .layer(ServiceBuilder::new().layer(cors))
        .with_state(state);

    Ok(app)
}

fn api_v1_routes() -> Router<AppState> {
    Router::new()
        // Clusters
        .route("/clusters", get(clusters::list_clusters).post(clusters::create_cluster))
        .route(
            "/clusters/:id",
            get(clusters::get_cluster)
                .put(clusters::update_cluster)
                .delete(clusters::delete_cluster),
        )
        .route("/clusters/:id/customers", get(customers::list_customers_by_cluster))
        // Customers
        .route("/customers", get(customers::list_customers).post(customers::create_customer))
        .route("/customers/grouped", get(customers::customers_grouped_by_cluster))
        .route(
            "/customers/:id",
            get(customers::get_customer)
                .put(customers::update_customer)
                .delete(customers::delete_customer),
        )
        // Releases
        .route("/releases", get(releases::list_releases).post(releases::create_release))
        .route("/releases/active", get(releases::active_releases))
        .route("/releases/stats", get(releases::release_stats))
        .route(
            "/releases/:id",
            get(releases::get_release)
                .put(releases::update_release)
                .delete(releases::delete_release),
        )
        .route("/releases/:id/activate", post(releases::activate_release))
        .route("/releases/:id/customers", post(releases::add_customers))
        .route("/releases/:id/archive", post(releases::archive_release))
        .route("/releases/:id/clone", post(releases::clone_release))
        .route("/releases/:id/stats", get(releases::step_stats))
        .route("/releases/:id/steps", get(releases::steps_grouped_by_cluster))
        .route("/releases/:id/steps/by-customer", get(releases::steps_by_customer))
        .route("/releases/:id/matrix", get(releases::matrix))
        // Templates
        .route(
            "/releases/:id/templates",
            get(templates::list_templates).post(templates::add_template),
        )
        .route(
            "/templates/:id",
            axum::routing::put(templates::update_template).delete(templates::delete_template),
        )
        .route("/steps/reorder", post(templates::reorder_steps))
        // Steps
        .route(
            "/releases/:id/customers/:customer_id/steps",
            get(steps::customer_steps).post(steps::add_custom_step),
        )
        .route("/steps/bulk-done", post(steps::bulk_mark_done))
        .route(
            "/steps/:id",
            get(steps::get_step)
                .put(steps::edit_custom_step)
                .delete(steps::delete_custom_step),
        )
        .route("/steps/:id/detail", get(steps::step_detail))
        .route("/steps/:id/done", post(steps::mark_done))
        .route("/steps/:id/skip", post(steps::skip))
        .route("/steps/:id/revert", post(steps::revert))
        .route("/steps/:id/override", post(steps::override_content))
        .route("/steps/:id/reset", post(steps::reset_to_template))
}
