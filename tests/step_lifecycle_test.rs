//! Step state machine, content overrides, custom steps and statistics

mod common;

use anyhow::Result;
use common::*;
use release_tracker::database::entities::{StepCategory, StepStatus, StepType};
use release_tracker::errors::CoreErrorKind;
use release_tracker::ordering::index_between;
use release_tracker::services::{
    ActivationService, CustomStepInput, CustomStepUpdate, MatrixService, ReleaseService,
    StepKey, StepService, StepStats, TemplateService,
};

#[tokio::test]
async fn test_release_walkthrough() -> Result<()> {
    let db = memory_db().await?;
    let release = create_release(&db, "R").await?;
    let t1 = add_template(&db, release.id, StepCategory::Deploy, "t1").await?;
    let t2 = add_template(&db, release.id, StepCategory::Deploy, "t2").await?;
    let cluster = create_cluster(&db, "C").await?;
    let x = create_customer(&db, cluster.id, "x").await?;

    ActivationService::new(db.clone())
        .activate_release(release.id, Some(vec![x.id]))
        .await?;

    let steps = StepService::new(db.clone());
    let materialized = steps.get_customer_steps(release.id, x.id).await?;
    assert_eq!(materialized.len(), 2);
    assert_eq!(materialized[0].template_id, Some(t1.id));
    assert_eq!(materialized[1].template_id, Some(t2.id));
    assert!(materialized.iter().all(|s| s.status == StepStatus::Pending));

    let done = steps
        .mark_done(materialized[0].id, Some("ran fine".to_string()), Some("ops".to_string()))
        .await?;
    assert_eq!(done.status, StepStatus::Done);
    assert!(done.executed_at.is_some());
    assert_eq!(done.notes.as_deref(), Some("ran fine"));
    assert_eq!(done.executed_by.as_deref(), Some("ops"));

    let skipped = steps
        .skip(materialized[1].id, "not applicable".to_string())
        .await?;
    assert_eq!(skipped.status, StepStatus::Skipped);
    assert_eq!(skipped.skip_reason.as_deref(), Some("not applicable"));

    let stats = steps.get_step_stats(release.id).await?;
    assert_eq!(
        stats,
        StepStats {
            total: 2,
            done: 1,
            skipped: 1,
            pending: 0,
            reverted: 0,
            percentage: 100,
        }
    );

    Ok(())
}

#[tokio::test]
async fn test_revert_and_redo() -> Result<()> {
    let db = memory_db().await?;
    let release = create_release(&db, "R").await?;
    add_template(&db, release.id, StepCategory::Deploy, "t1").await?;
    let cluster = create_cluster(&db, "C").await?;
    let x = create_customer(&db, cluster.id, "x").await?;
    ActivationService::new(db.clone())
        .activate_release(release.id, None)
        .await?;

    let steps = StepService::new(db.clone());
    let step = steps.get_customer_steps(release.id, x.id).await?[0].clone();

    let err = steps.revert(step.id, None).await.unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::InvalidState);

    let done = steps.mark_done(step.id, None, None).await?;
    let err = steps.mark_done(step.id, None, None).await.unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::InvalidState);

    let reverted = steps
        .revert(step.id, Some("broke staging".to_string()))
        .await?;
    assert_eq!(reverted.status, StepStatus::Reverted);
    assert_eq!(reverted.notes.as_deref(), Some("broke staging"));
    assert_eq!(reverted.executed_at, done.executed_at);

    let stats = steps.get_step_stats(release.id).await?;
    assert_eq!(stats.reverted, 1);
    assert_eq!(stats.percentage, 0);

    let redone = steps.mark_done(step.id, None, None).await?;
    assert_eq!(redone.status, StepStatus::Done);

    let err = steps.skip(9999, "gone".to_string()).await.unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::NotFound);

    Ok(())
}

#[tokio::test]
async fn test_override_then_reset_restores_template() -> Result<()> {
    let db = memory_db().await?;
    let release = create_release(&db, "R").await?;
    let template = add_template(&db, release.id, StepCategory::Deploy, "migrate").await?;
    let cluster = create_cluster(&db, "C").await?;
    let x = create_customer(&db, cluster.id, "x").await?;
    ActivationService::new(db.clone())
        .activate_release(release.id, None)
        .await?;

    let steps = StepService::new(db.clone());
    let step = steps.get_customer_steps(release.id, x.id).await?[0].clone();

    let overridden = steps
        .override_content(step.id, "./migrate.sh --tenant x".to_string())
        .await?;
    assert!(overridden.is_overridden);
    assert_eq!(overridden.content, "./migrate.sh --tenant x");

    let reset = steps.reset_to_template(step.id).await?;
    assert!(!reset.is_overridden);
    assert_eq!(reset.content, template.content);
    assert_eq!(reset.name, template.name);

    Ok(())
}

#[tokio::test]
async fn test_custom_step_lifecycle() -> Result<()> {
    let db = memory_db().await?;
    let release = create_release(&db, "R").await?;
    add_template(&db, release.id, StepCategory::Deploy, "t1").await?;
    add_template(&db, release.id, StepCategory::Deploy, "t2").await?;
    let cluster = create_cluster(&db, "C").await?;
    let x = create_customer(&db, cluster.id, "x").await?;
    let y = create_customer(&db, cluster.id, "y").await?;
    ActivationService::new(db.clone())
        .activate_release(release.id, None)
        .await?;

    let steps = StepService::new(db.clone());
    let existing = steps.get_customer_steps(release.id, x.id).await?;
    let between = index_between(Some(existing[0].order_index), Some(existing[1].order_index));

    let outcome = steps
        .add_custom_step(
            release.id,
            x.id,
            CustomStepInput {
                name: "flush cache".to_string(),
                category: StepCategory::Deploy,
                step_type: StepType::Text,
                content: "Ask x to flush their CDN".to_string(),
                order_index: between,
                add_to_template: false,
            },
        )
        .await?;
    assert!(outcome.template.is_none());
    let custom = outcome.step;
    assert!(custom.is_custom);
    assert_eq!(custom.template_id, None);
    assert_eq!(custom.order_index, 0.5);

    let ordered: Vec<i32> = steps
        .get_customer_steps(release.id, x.id)
        .await?
        .iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(ordered, vec![existing[0].id, custom.id, existing[1].id]);

    let err = steps.reset_to_template(custom.id).await.unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::NotFound);
    let err = steps
        .override_content(custom.id, "x".to_string())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::Validation);

    let edited = steps
        .edit_custom_step(
            custom.id,
            CustomStepUpdate {
                content: Some("Ask x to purge their CDN".to_string()),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(edited.content, "Ask x to purge their CDN");

    let err = steps
        .delete_custom_step(existing[0].id)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::Validation);
    let err = steps
        .edit_custom_step(existing[0].id, CustomStepUpdate::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::Validation);

    let matrix = MatrixService::new(db.clone())
        .build_matrix(release.id, StepCategory::Deploy)
        .await?;
    assert_eq!(matrix.len(), 1);
    assert_eq!(matrix[0].rows.len(), 3);
    assert_eq!(matrix[0].rows[1].key, StepKey::Custom(custom.id));
    let y_column = matrix[0]
        .customers
        .iter()
        .find(|column| column.customer.id == y.id)
        .expect("y column");
    assert!(y_column.cells[1].is_none());

    steps.delete_custom_step(custom.id).await?;
    assert_eq!(steps.get_customer_steps(release.id, x.id).await?.len(), 2);

    Ok(())
}

#[tokio::test]
async fn test_custom_step_added_to_template_reaches_later_customers_only() -> Result<()> {
    let db = memory_db().await?;
    let release = create_release(&db, "R").await?;
    add_template(&db, release.id, StepCategory::Verify, "smoke").await?;
    let cluster = create_cluster(&db, "C").await?;
    let x = create_customer(&db, cluster.id, "x").await?;
    let y = create_customer(&db, cluster.id, "y").await?;
    let activation = ActivationService::new(db.clone());
    activation.activate_release(release.id, Some(vec![x.id, y.id])).await?;

    let steps = StepService::new(db.clone());
    let outcome = steps
        .add_custom_step(
            release.id,
            x.id,
            CustomStepInput {
                name: "check metrics".to_string(),
                category: StepCategory::Verify,
                step_type: StepType::Text,
                content: "Dashboards green".to_string(),
                order_index: 1.0,
                add_to_template: true,
            },
        )
        .await?;
    let template = outcome.template.expect("template created");
    assert_eq!(template.order_index, 1);

    assert_eq!(steps.get_customer_steps(release.id, x.id).await?.len(), 2);
    assert_eq!(steps.get_customer_steps(release.id, y.id).await?.len(), 1);

    let z = create_customer(&db, cluster.id, "z").await?;
    activation.add_customers_to_release(release.id, vec![z.id]).await?;
    let for_z = steps.get_customer_steps(release.id, z.id).await?;
    assert_eq!(for_z.len(), 2);
    assert_eq!(for_z[1].template_id, Some(template.id));

    assert_eq!(
        TemplateService::new(db.clone())
            .list_templates(release.id)
            .await?
            .len(),
        2
    );

    Ok(())
}

#[tokio::test]
async fn test_custom_step_requires_active_release() -> Result<()> {
    let db = memory_db().await?;
    let release = create_release(&db, "Draft").await?;
    let cluster = create_cluster(&db, "C").await?;
    let x = create_customer(&db, cluster.id, "x").await?;

    let err = StepService::new(db.clone())
        .add_custom_step(
            release.id,
            x.id,
            CustomStepInput {
                name: "note".to_string(),
                category: StepCategory::Deploy,
                step_type: StepType::Text,
                content: String::new(),
                order_index: 0.0,
                add_to_template: false,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), CoreErrorKind::InvalidState);

    Ok(())
}

#[tokio::test]
async fn test_bulk_mark_done_reports_failures() -> Result<()> {
    let db = memory_db().await?;
    let release = create_release(&db, "R").await?;
    add_template(&db, release.id, StepCategory::Deploy, "t1").await?;
    add_template(&db, release.id, StepCategory::Deploy, "t2").await?;
    let cluster = create_cluster(&db, "C").await?;
    let x = create_customer(&db, cluster.id, "x").await?;
    ActivationService::new(db.clone())
        .activate_release(release.id, None)
        .await?;

    let steps = StepService::new(db.clone());
    let ids: Vec<i32> = steps
        .get_customer_steps(release.id, x.id)
        .await?
        .iter()
        .map(|s| s.id)
        .collect();
    steps.skip(ids[1], "later".to_string()).await?;

    let outcome = steps
        .bulk_mark_done(vec![ids[0], ids[1], 4040], Some("ops".to_string()))
        .await;
    assert_eq!(outcome.succeeded, vec![ids[0]]);
    let failed: Vec<i32> = outcome.failed.iter().map(|(id, _)| *id).collect();
    assert_eq!(failed, vec![ids[1], 4040]);

    let stats = ReleaseService::new(db.clone()).get_release_stats().await?;
    assert_eq!(stats.total_releases, 1);
    assert_eq!(stats.active_releases, 1);
    assert_eq!(stats.done_steps, 1);
    assert_eq!(stats.skipped_steps, 1);
    assert_eq!(stats.pending_steps, 0);

    Ok(())
}

#[tokio::test]
async fn test_step_details_include_customer_cluster_and_template() -> Result<()> {
    let db = memory_db().await?;
    let release = create_release(&db, "R").await?;
    let template = add_template(&db, release.id, StepCategory::Deploy, "t1").await?;
    let cluster = create_cluster(&db, "eu-west").await?;
    let x = create_customer(&db, cluster.id, "x").await?;
    ActivationService::new(db.clone())
        .activate_release(release.id, None)
        .await?;

    let steps = StepService::new(db.clone());
    let step = steps.get_customer_steps(release.id, x.id).await?[0].clone();
    let details = steps.get_step_with_details(step.id).await?;

    assert_eq!(details.step.id, step.id);
    assert_eq!(details.customer.map(|c| c.id), Some(x.id));
    assert_eq!(details.cluster.map(|c| c.name), Some("eu-west".to_string()));
    assert_eq!(details.template.map(|t| t.id), Some(template.id));

    Ok(())
}
