use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::database::entities::{
    customer_steps, customers, releases, step_templates, ReleaseStatus, StepStatus,
};
use crate::errors::{CoreError, CoreResult};
use crate::services::lookup::{find_release, touch_release};

/// Rows per INSERT statement, kept well under SQLite's bound-parameter limit.
const INSERT_CHUNK: usize = 50;

#[derive(Clone)]
pub struct ActivationService {
    db: DatabaseConnection,
}

#[derive(Clone, Debug, Serialize)]
pub struct ActivationOutcome {
    pub release: releases::Model,
    pub customer_ids: Vec<i32>,
    pub steps_created: usize,
}

/// One pending step per (customer, template) pair, copying the template's
/// definition.
pub fn materialize_steps(
    release_id: i32,
    customer_ids: &[i32],
    templates: &[step_templates::Model],
    now: DateTime<Utc>,
) -> Vec<customer_steps::ActiveModel> {
    customer_ids
        .iter()
        .flat_map(|customer_id| {
            templates.iter().map(move |template| customer_steps::ActiveModel {
                release_id: Set(release_id),
                customer_id: Set(*customer_id),
                template_id: Set(Some(template.id)),
                name: Set(template.name.clone()),
                category: Set(template.category),
                step_type: Set(template.step_type),
                content: Set(template.content.clone()),
                order_index: Set(f64::from(template.order_index)),
                status: Set(StepStatus::Pending),
                executed_at: Set(None),
                executed_by: Set(None),
                skip_reason: Set(None),
                notes: Set(None),
                is_custom: Set(false),
                is_overridden: Set(false),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            })
        })
        .collect()
}

impl ActivationService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Moves a draft release to active and materializes its templates for the
    /// target customers.
    ///
    /// `customer_ids` of `None` targets every active customer; otherwise the
    /// list is intersected with the active customers. The status flip is the
    /// first write of the transaction and only matches a draft row, so of two
    /// concurrent activations exactly one succeeds.
    #[tracing::instrument(skip(self))]
    pub async fn activate_release(
        &self,
        release_id: i32,
        customer_ids: Option<Vec<i32>>,
    ) -> CoreResult<ActivationOutcome> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        let flipped = releases::Entity::update_many()
            .set(releases::ActiveModel {
                status: Set(ReleaseStatus::Active),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(releases::Column::Id.eq(release_id))
            .filter(releases::Column::Status.eq(ReleaseStatus::Draft))
            .exec(&txn)
            .await?;

        if flipped.rows_affected == 0 {
            let release = find_release(&txn, release_id).await?;
            return Err(CoreError::invalid_state(format!(
                "Release {} is {:?}; only draft releases can be activated",
                release_id, release.status
            ))
            .with_field("release_id", release_id));
        }

        let targets = active_customer_ids(&txn, customer_ids.as_deref()).await?;
        let templates = release_templates(&txn, release_id).await?;
        let rows = materialize_steps(release_id, &targets, &templates, now);
        let steps_created = rows.len();
        insert_steps(&txn, rows).await?;

        let release = find_release(&txn, release_id).await?;
        txn.commit().await?;

        info!(
            "Activated release {} for {} customer(s), {} step(s) created",
            release_id,
            targets.len(),
            steps_created
        );
        Ok(ActivationOutcome {
            release,
            customer_ids: targets,
            steps_created,
        })
    }

    /// Materializes the current templates for customers that have no steps in
    /// an active release yet. Unknown, inactive and already-present customers
    /// are dropped; nothing left to add is a validation error.
    #[tracing::instrument(skip(self))]
    pub async fn add_customers_to_release(
        &self,
        release_id: i32,
        customer_ids: Vec<i32>,
    ) -> CoreResult<ActivationOutcome> {
        let now = Utc::now();
        let txn = self.db.begin().await?;
        touch_release(&txn, release_id, &[ReleaseStatus::Active]).await?;

        let present: HashSet<i32> = customer_steps::Entity::find()
            .select_only()
            .column(customer_steps::Column::CustomerId)
            .distinct()
            .filter(customer_steps::Column::ReleaseId.eq(release_id))
            .into_tuple::<i32>()
            .all(&txn)
            .await?
            .into_iter()
            .collect();

        let targets: Vec<i32> = active_customer_ids(&txn, Some(&customer_ids))
            .await?
            .into_iter()
            .filter(|id| !present.contains(id))
            .collect();

        if targets.is_empty() {
            return Err(CoreError::validation(
                "All selected customers are already part of this release",
            )
            .with_field("release_id", release_id));
        }

        let templates = release_templates(&txn, release_id).await?;
        let rows = materialize_steps(release_id, &targets, &templates, now);
        let steps_created = rows.len();
        insert_steps(&txn, rows).await?;

        let release = find_release(&txn, release_id).await?;
        txn.commit().await?;

        info!(
            "Added {} customer(s) to release {}, {} step(s) created",
            targets.len(),
            release_id,
            steps_created
        );
        Ok(ActivationOutcome {
            release,
            customer_ids: targets,
            steps_created,
        })
    }
}

async fn active_customer_ids<C: ConnectionTrait>(
    conn: &C,
    requested: Option<&[i32]>,
) -> CoreResult<Vec<i32>> {
    let mut query = customers::Entity::find()
        .select_only()
        .column(customers::Column::Id)
        .filter(customers::Column::IsActive.eq(true));

    if let Some(ids) = requested {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        query = query.filter(customers::Column::Id.is_in(ids.iter().copied()));
    }

    Ok(query
        .order_by_asc(customers::Column::Id)
        .into_tuple::<i32>()
        .all(conn)
        .await?)
}

async fn release_templates<C: ConnectionTrait>(
    conn: &C,
    release_id: i32,
) -> CoreResult<Vec<step_templates::Model>> {
    Ok(step_templates::Entity::find()
        .filter(step_templates::Column::ReleaseId.eq(release_id))
        .order_by_asc(step_templates::Column::Category)
        .order_by_asc(step_templates::Column::OrderIndex)
        .all(conn)
        .await?)
}

async fn insert_steps<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<customer_steps::ActiveModel>,
) -> CoreResult<()> {
    if rows.is_empty() {
        debug!("No customer steps to insert");
        return Ok(());
    }

    let mut rows = rows.into_iter().peekable();
    while rows.peek().is_some() {
        let chunk: Vec<_> = rows.by_ref().take(INSERT_CHUNK).collect();
        debug!("Inserting {} customer step(s)", chunk.len());
        customer_steps::Entity::insert_many(chunk).exec(conn).await?;
    }
    Ok(())
}
