use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::common::normalize_optional_text;
use crate::database::entities::{
    customer_steps, step_templates, ReleaseStatus, StepCategory, StepStatus, StepType,
};
use crate::errors::{CoreError, CoreResult};
use crate::ordering;
use crate::services::lookup::{find_release, find_template, touch_release};

/// Template structure may change while a release is a draft or in flight.
const EDITABLE: &[ReleaseStatus] = &[ReleaseStatus::Draft, ReleaseStatus::Active];

#[derive(Clone)]
pub struct TemplateService {
    db: DatabaseConnection,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewTemplate {
    pub release_id: i32,
    pub category: StepCategory,
    pub name: String,
    pub step_type: StepType,
    pub content: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TemplateUpdate {
    pub name: Option<String>,
    pub step_type: Option<StepType>,
    pub content: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TemplateDeletion {
    pub template_id: i32,
    pub removed_pending_steps: u64,
    pub orphaned_steps: u64,
}

impl TemplateService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Appends a template to its release/category inside the caller's
    /// transaction. The caller is responsible for checking release status.
    pub(crate) async fn insert_template<C: ConnectionTrait>(
        conn: &C,
        input: NewTemplate,
    ) -> CoreResult<step_templates::Model> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(CoreError::validation("Template name cannot be empty"));
        }

        let order_index = current_next_index(conn, input.release_id, input.category).await?;
        let template = step_templates::ActiveModel {
            release_id: Set(input.release_id),
            name: Set(name),
            category: Set(input.category),
            step_type: Set(input.step_type),
            content: Set(input.content),
            order_index: Set(order_index),
            description: Set(normalize_optional_text(input.description)),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        Ok(template.insert(conn).await?)
    }

    pub async fn add_template(&self, input: NewTemplate) -> CoreResult<step_templates::Model> {
        let txn = self.db.begin().await?;
        touch_release(&txn, input.release_id, EDITABLE).await?;

        let created = Self::insert_template(&txn, input).await?;
        txn.commit().await?;

        info!(
            "Added template {} to release {} ({} #{})",
            created.id,
            created.release_id,
            created.category.as_str(),
            created.order_index
        );
        Ok(created)
    }

    /// Updates a template. New name or content values also flow into customer
    /// steps on this template that are still pending and not overridden.
    pub async fn update_template(
        &self,
        id: i32,
        update: TemplateUpdate,
    ) -> CoreResult<step_templates::Model> {
        let txn = self.db.begin().await?;
        let template = find_template(&txn, id).await?;
        touch_release(&txn, template.release_id, EDITABLE).await?;

        let mut active: step_templates::ActiveModel = template.into();
        let mut propagated = customer_steps::ActiveModel {
            ..Default::default()
        };
        let mut propagate = false;

        if let Some(name) = update.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(CoreError::validation("Template name cannot be empty"));
            }
            active.name = Set(name.clone());
            propagated.name = Set(name);
            propagate = true;
        }
        if let Some(content) = update.content {
            active.content = Set(content.clone());
            propagated.content = Set(content);
            propagate = true;
        }
        if let Some(step_type) = update.step_type {
            active.step_type = Set(step_type);
        }
        if let Some(description) = update.description {
            active.description = Set(normalize_optional_text(Some(description)));
        }

        let updated = active.update(&txn).await?;

        if propagate {
            propagated.updated_at = Set(Utc::now());
            let result = customer_steps::Entity::update_many()
                .set(propagated)
                .filter(customer_steps::Column::TemplateId.eq(id))
                .filter(customer_steps::Column::Status.eq(StepStatus::Pending))
                .filter(customer_steps::Column::IsOverridden.eq(false))
                .exec(&txn)
                .await?;
            debug!(
                "Propagated template {} changes to {} pending step(s)",
                id, result.rows_affected
            );
        }

        txn.commit().await?;
        Ok(updated)
    }

    /// Deletes a template. Pending customer steps on it are removed; steps that
    /// were already acted on keep their history and lose the template link.
    #[tracing::instrument(skip(self))]
    pub async fn delete_template(&self, id: i32) -> CoreResult<TemplateDeletion> {
        let txn = self.db.begin().await?;
        let template = find_template(&txn, id).await?;
        touch_release(&txn, template.release_id, EDITABLE).await?;

        let removed = customer_steps::Entity::delete_many()
            .filter(customer_steps::Column::TemplateId.eq(id))
            .filter(customer_steps::Column::Status.eq(StepStatus::Pending))
            .exec(&txn)
            .await?;

        let orphaned = customer_steps::Entity::update_many()
            .col_expr(
                customer_steps::Column::TemplateId,
                Expr::value(Option::<i32>::None),
            )
            .col_expr(customer_steps::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(customer_steps::Column::TemplateId.eq(id))
            .exec(&txn)
            .await?;

        step_templates::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(
            "Deleted template {}: removed {} pending step(s), kept {} acted-on step(s)",
            id, removed.rows_affected, orphaned.rows_affected
        );
        Ok(TemplateDeletion {
            template_id: id,
            removed_pending_steps: removed.rows_affected,
            orphaned_steps: orphaned.rows_affected,
        })
    }

    /// Rewrites the order of every template in a release/category so that
    /// each id's index equals its position in `ordered_ids`. Materialized
    /// customer steps on those templates follow.
    ///
    /// `ordered_ids` must name exactly the templates of that category; any
    /// foreign, missing or repeated id rejects the whole batch. Rows are first
    /// parked above every live index and then written to their final
    /// positions, all in one transaction, so the unique index never sees two
    /// templates at the same position.
    #[tracing::instrument(skip(self))]
    pub async fn reorder_templates(
        &self,
        release_id: i32,
        category: StepCategory,
        ordered_ids: Vec<i32>,
    ) -> CoreResult<Vec<step_templates::Model>> {
        let txn = self.db.begin().await?;
        touch_release(&txn, release_id, EDITABLE).await?;

        let existing = step_templates::Entity::find()
            .filter(step_templates::Column::ReleaseId.eq(release_id))
            .filter(step_templates::Column::Category.eq(category))
            .all(&txn)
            .await?;

        validate_reorder(&existing, &ordered_ids).map_err(|err| {
            err.with_field("release_id", release_id)
                .with_field("category", category.as_str())
        })?;

        let live_max = existing.iter().map(|template| template.order_index).max();
        let base = ordering::staging_base(live_max);

        // Phase 1: park every row in the staging range.
        for (position, id) in ordered_ids.iter().enumerate() {
            let staged = base + position as i32;
            set_positions(&txn, release_id, *id, staged).await?;
        }

        // Phase 2: final positions.
        for (position, id) in ordered_ids.iter().enumerate() {
            set_positions(&txn, release_id, *id, position as i32).await?;
        }

        let reordered = step_templates::Entity::find()
            .filter(step_templates::Column::ReleaseId.eq(release_id))
            .filter(step_templates::Column::Category.eq(category))
            .order_by_asc(step_templates::Column::OrderIndex)
            .all(&txn)
            .await?;

        txn.commit().await?;
        info!(
            "Reordered {} {} template(s) in release {}",
            ordered_ids.len(),
            category.as_str(),
            release_id
        );
        Ok(reordered)
    }

    pub async fn list_templates(&self, release_id: i32) -> CoreResult<Vec<step_templates::Model>> {
        find_release(&self.db, release_id).await?;
        Ok(step_templates::Entity::find()
            .filter(step_templates::Column::ReleaseId.eq(release_id))
            .order_by_asc(step_templates::Column::Category)
            .order_by_asc(step_templates::Column::OrderIndex)
            .all(&self.db)
            .await?)
    }

    pub async fn list_templates_by_category(
        &self,
        release_id: i32,
        category: StepCategory,
    ) -> CoreResult<Vec<step_templates::Model>> {
        Ok(step_templates::Entity::find()
            .filter(step_templates::Column::ReleaseId.eq(release_id))
            .filter(step_templates::Column::Category.eq(category))
            .order_by_asc(step_templates::Column::OrderIndex)
            .all(&self.db)
            .await?)
    }

    pub async fn next_order_index(
        &self,
        release_id: i32,
        category: StepCategory,
    ) -> CoreResult<i32> {
        current_next_index(&self.db, release_id, category).await
    }

    pub async fn get_template(&self, id: i32) -> CoreResult<step_templates::Model> {
        find_template(&self.db, id).await
    }
}

async fn current_next_index<C: ConnectionTrait>(
    conn: &C,
    release_id: i32,
    category: StepCategory,
) -> CoreResult<i32> {
    let indices: Vec<i32> = step_templates::Entity::find()
        .select_only()
        .column(step_templates::Column::OrderIndex)
        .filter(step_templates::Column::ReleaseId.eq(release_id))
        .filter(step_templates::Column::Category.eq(category))
        .into_tuple()
        .all(conn)
        .await?;

    Ok(ordering::next_order_index(indices))
}

async fn set_positions<C: ConnectionTrait>(
    conn: &C,
    release_id: i32,
    template_id: i32,
    position: i32,
) -> CoreResult<()> {
    step_templates::Entity::update_many()
        .col_expr(step_templates::Column::OrderIndex, Expr::value(position))
        .filter(step_templates::Column::Id.eq(template_id))
        .exec(conn)
        .await?;

    customer_steps::Entity::update_many()
        .col_expr(customer_steps::Column::OrderIndex, Expr::value(f64::from(position)))
        .filter(customer_steps::Column::ReleaseId.eq(release_id))
        .filter(customer_steps::Column::TemplateId.eq(template_id))
        .exec(conn)
        .await?;

    Ok(())
}

fn validate_reorder(existing: &[step_templates::Model], ordered_ids: &[i32]) -> CoreResult<()> {
    let known: HashSet<i32> = existing.iter().map(|template| template.id).collect();
    let mut seen = HashSet::with_capacity(ordered_ids.len());

    for id in ordered_ids {
        if !known.contains(id) {
            return Err(CoreError::validation(format!(
                "Template {} does not belong to this release and category",
                id
            ))
            .with_field("template_id", id));
        }
        if !seen.insert(*id) {
            return Err(
                CoreError::validation(format!("Template {} is listed twice", id))
                    .with_field("template_id", id),
            );
        }
    }

    if seen.len() != known.len() {
        return Err(CoreError::validation(format!(
            "Reorder must list all {} templates of the category, got {}",
            known.len(),
            seen.len()
        )));
    }

    Ok(())
}
