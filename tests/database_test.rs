//! Database functionality tests
//!
//! Migrations, store-level constraints and cascade behaviour

mod common;

use anyhow::Result;
use chrono::Utc;
use common::*;
use release_tracker::database::entities::*;
use release_tracker::database::migrations::Migrator;
use release_tracker::errors::{CoreError, CoreErrorKind};
use release_tracker::services::{ActivationService, ReleaseService};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use sea_orm_migration::MigratorTrait;

fn template_row(release_id: i32, order_index: i32) -> step_templates::ActiveModel {
    step_templates::ActiveModel {
        release_id: Set(release_id),
        name: Set(format!("step {}", order_index)),
        category: Set(StepCategory::Deploy),
        step_type: Set(StepType::Sql),
        content: Set("select 1".to_string()),
        order_index: Set(order_index),
        description: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_database_migrations() -> Result<()> {
    let test_db = file_db().await?;
    let db = &test_db.db;

    assert_eq!(clusters::Entity::find().all(db).await?.len(), 0);
    assert_eq!(customers::Entity::find().all(db).await?.len(), 0);
    assert_eq!(releases::Entity::find().all(db).await?.len(), 0);
    assert_eq!(step_templates::Entity::find().all(db).await?.len(), 0);
    assert_eq!(customer_steps::Entity::find().all(db).await?.len(), 0);

    Migrator::down(db, None).await?;
    Migrator::up(db, None).await?;
    assert_eq!(releases::Entity::find().all(db).await?.len(), 0);

    Ok(())
}

#[tokio::test]
async fn test_template_order_is_unique_per_category() -> Result<()> {
    let db = memory_db().await?;
    let release = create_release(&db, "R").await?;

    template_row(release.id, 0).insert(&db).await?;
    let err = template_row(release.id, 0).insert(&db).await.unwrap_err();
    assert_eq!(
        CoreError::from(err).kind(),
        CoreErrorKind::ConstraintViolation
    );

    let mut verify = template_row(release.id, 0);
    verify.category = Set(StepCategory::Verify);
    verify.insert(&db).await?;

    Ok(())
}

#[tokio::test]
async fn test_customer_cannot_receive_template_twice() -> Result<()> {
    let db = memory_db().await?;
    let cluster = create_cluster(&db, "C").await?;
    let x = create_customer(&db, cluster.id, "x").await?;
    let release = create_release(&db, "R").await?;
    add_template(&db, release.id, StepCategory::Deploy, "t1").await?;
    ActivationService::new(db.clone())
        .activate_release(release.id, None)
        .await?;

    let existing = customer_steps::Entity::find()
        .filter(customer_steps::Column::CustomerId.eq(x.id))
        .one(&db)
        .await?
        .unwrap();

    let now = Utc::now();
    let duplicate = customer_steps::ActiveModel {
        release_id: Set(release.id),
        customer_id: Set(x.id),
        template_id: Set(existing.template_id),
        name: Set(existing.name.clone()),
        category: Set(existing.category),
        step_type: Set(existing.step_type),
        content: Set(existing.content.clone()),
        order_index: Set(existing.order_index),
        status: Set(StepStatus::Pending),
        is_custom: Set(false),
        is_overridden: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let err = duplicate.insert(&db).await.unwrap_err();
    assert_eq!(
        CoreError::from(err).kind(),
        CoreErrorKind::ConstraintViolation
    );

    // Custom steps carry no template and are exempt.
    for name in ["one", "two"] {
        customer_steps::ActiveModel {
            release_id: Set(release.id),
            customer_id: Set(x.id),
            template_id: Set(None),
            name: Set(name.to_string()),
            category: Set(StepCategory::Deploy),
            step_type: Set(StepType::Text),
            content: Set(String::new()),
            order_index: Set(5.0),
            status: Set(StepStatus::Pending),
            is_custom: Set(true),
            is_overridden: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&db)
        .await?;
    }

    Ok(())
}

#[tokio::test]
async fn test_delete_release_cascades() -> Result<()> {
    let db = memory_db().await?;
    let cluster = create_cluster(&db, "C").await?;
    create_customer(&db, cluster.id, "x").await?;
    let release = create_release(&db, "R").await?;
    add_template(&db, release.id, StepCategory::Deploy, "t1").await?;
    ActivationService::new(db.clone())
        .activate_release(release.id, None)
        .await?;

    let releases = ReleaseService::new(db.clone());
    releases.delete_release(release.id).await?;

    assert_eq!(step_templates::Entity::find().count(&db).await?, 0);
    assert_eq!(customer_steps::Entity::find().count(&db).await?, 0);

    let err = releases.delete_release(release.id).await.unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::NotFound);

    Ok(())
}

#[tokio::test]
async fn test_cluster_with_active_customers_cannot_be_deleted() -> Result<()> {
    let db = memory_db().await?;
    let cluster = create_cluster(&db, "C").await?;
    create_customer(&db, cluster.id, "x").await?;

    let err = release_tracker::services::ClusterService::new(db.clone())
        .delete_cluster(cluster.id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::Validation);

    let err = clusters::Entity::delete_by_id(cluster.id)
        .exec(&db)
        .await
        .unwrap_err();
    assert_eq!(
        CoreError::from(err).kind(),
        CoreErrorKind::ConstraintViolation
    );

    Ok(())
}

#[tokio::test]
async fn test_clone_release_copies_templates() -> Result<()> {
    let db = memory_db().await?;
    let release = create_release(&db, "2024.06").await?;
    add_template(&db, release.id, StepCategory::Deploy, "migrate").await?;
    add_template(&db, release.id, StepCategory::Verify, "smoke").await?;

    let releases = ReleaseService::new(db.clone());
    let cloned = releases.clone_release(release.id, "2024.07").await?;

    assert_eq!(cloned.status, ReleaseStatus::Draft);
    assert_eq!(cloned.release_type, release.release_type);
    assert_eq!(
        cloned.description.as_deref(),
        Some("Cloned from: 2024.06\n\nTest release")
    );

    let copied = releases.get_release_with_templates(cloned.id).await?;
    let names: Vec<&str> = copied.templates.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["migrate", "smoke"]);

    Ok(())
}
