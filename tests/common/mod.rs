//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use anyhow::Result;
use release_tracker::database::entities::{
    clusters, customers, releases, step_templates, ReleaseType, StepCategory, StepType,
};
use release_tracker::database::{establish_connection, setup_database};
use release_tracker::services::{
    ClusterInput, ClusterService, CustomerInput, CustomerService, NewTemplate, ReleaseInput,
    ReleaseService, TemplateService,
};
use sea_orm::{Database, DatabaseConnection};
use tempfile::TempDir;

/// File-backed database; the directory lives as long as this value.
pub struct TestDb {
    pub db: DatabaseConnection,
    _dir: TempDir,
}

pub async fn file_db() -> Result<TestDb> {
    let dir = TempDir::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());

    let db = establish_connection(&db_url).await?;
    setup_database(&db).await?;

    Ok(TestDb { db, _dir: dir })
}

pub async fn memory_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    setup_database(&db).await?;
    Ok(db)
}

pub async fn create_cluster(db: &DatabaseConnection, name: &str) -> Result<clusters::Model> {
    Ok(ClusterService::new(db.clone())
        .create_cluster(ClusterInput {
            name: name.to_string(),
            ..Default::default()
        })
        .await?)
}

pub async fn create_customer(
    db: &DatabaseConnection,
    cluster_id: i32,
    namespace: &str,
) -> Result<customers::Model> {
    Ok(CustomerService::new(db.clone())
        .create_customer(CustomerInput {
            cluster_id,
            namespace: namespace.to_string(),
            name: namespace.to_uppercase(),
            description: None,
        })
        .await?)
}

pub async fn create_release(db: &DatabaseConnection, name: &str) -> Result<releases::Model> {
    Ok(ReleaseService::new(db.clone())
        .create_release(ReleaseInput {
            name: name.to_string(),
            release_type: ReleaseType::Release,
            version_number: Some("1.0.0".to_string()),
            release_date: None,
            description: Some("Test release".to_string()),
        })
        .await?)
}

pub async fn add_template(
    db: &DatabaseConnection,
    release_id: i32,
    category: StepCategory,
    name: &str,
) -> Result<step_templates::Model> {
    Ok(TemplateService::new(db.clone())
        .add_template(NewTemplate {
            release_id,
            category,
            name: name.to_string(),
            step_type: StepType::Bash,
            content: format!("./{}.sh", name),
            description: None,
        })
        .await?)
}
