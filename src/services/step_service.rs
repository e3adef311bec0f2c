use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::common::normalize_optional_text;
use crate::database::entities::{
    clusters, customer_steps, customers, step_templates, ReleaseStatus, StepCategory,
    StepStatus, StepType,
};
use crate::errors::{CoreError, CoreErrorKind, CoreResult};
use crate::services::lookup::{find_customer, find_release, find_step, touch_release};
use crate::services::template_service::{NewTemplate, TemplateService};

const ACTIONABLE: &[StepStatus] = &[StepStatus::Pending, StepStatus::Reverted];
const REVERTIBLE: &[StepStatus] = &[StepStatus::Done, StepStatus::Skipped, StepStatus::Reverted];

#[derive(Clone)]
pub struct StepService {
    db: DatabaseConnection,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CustomStepInput {
    pub name: String,
    pub category: StepCategory,
    pub step_type: StepType,
    pub content: String,
    pub order_index: f64,
    #[serde(default)]
    pub add_to_template: bool,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CustomStepUpdate {
    pub name: Option<String>,
    pub category: Option<StepCategory>,
    pub step_type: Option<StepType>,
    pub content: Option<String>,
    pub order_index: Option<f64>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CustomStepOutcome {
    pub step: customer_steps::Model,
    /// Set when the step was also added to the release's templates.
    pub template: Option<step_templates::Model>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct BulkOutcome {
    pub succeeded: Vec<i32>,
    pub failed: Vec<(i32, String)>,
}

#[derive(Clone, Debug, Serialize)]
pub struct StepDetails {
    pub step: customer_steps::Model,
    pub customer: Option<customers::Model>,
    pub cluster: Option<clusters::Model>,
    pub template: Option<step_templates::Model>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StepStats {
    pub total: u64,
    pub done: u64,
    pub skipped: u64,
    pub pending: u64,
    pub reverted: u64,
    pub percentage: u64,
}

impl StepStats {
    /// Done and skipped steps count as progressed; the percentage is rounded
    /// half away from zero and is 0 for an empty set.
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = StepStatus>,
    {
        let mut stats = StepStats::default();
        let mut progressed = 0u64;
        for status in statuses {
            stats.total += 1;
            if status.is_progressed() {
                progressed += 1;
            }
            match status {
                StepStatus::Done => stats.done += 1,
                StepStatus::Skipped => stats.skipped += 1,
                StepStatus::Pending => stats.pending += 1,
                StepStatus::Reverted => stats.reverted += 1,
            }
        }

        if stats.total > 0 {
            stats.percentage = (100.0 * progressed as f64 / stats.total as f64).round() as u64;
        }
        stats
    }
}

fn required_name(name: &str) -> CoreResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation("Step name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn finite_index(order_index: f64) -> CoreResult<f64> {
    if !order_index.is_finite() {
        return Err(CoreError::validation("Step order index must be a finite number"));
    }
    Ok(order_index)
}

impl StepService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Applies a status change only when the step is currently in one of
    /// `from`. The status filter is part of the UPDATE, so concurrent
    /// transitions cannot both win.
    async fn transition(
        &self,
        id: i32,
        from: &[StepStatus],
        changes: customer_steps::ActiveModel,
    ) -> CoreResult<customer_steps::Model> {
        let result = customer_steps::Entity::update_many()
            .set(changes)
            .filter(customer_steps::Column::Id.eq(id))
            .filter(customer_steps::Column::Status.is_in(from.iter().copied()))
            .exec(&self.db)
            .await?;

        let step = find_step(&self.db, id).await?;
        if result.rows_affected == 0 {
            return Err(CoreError::invalid_state(format!(
                "Step {} is {:?}; expected one of {:?}",
                id, step.status, from
            ))
            .with_field("step_id", id));
        }
        Ok(step)
    }

    pub async fn mark_done(
        &self,
        id: i32,
        notes: Option<String>,
        executed_by: Option<String>,
    ) -> CoreResult<customer_steps::Model> {
        let now = Utc::now();
        let step = self
            .transition(
                id,
                ACTIONABLE,
                customer_steps::ActiveModel {
                    status: Set(StepStatus::Done),
                    executed_at: Set(Some(now)),
                    executed_by: Set(normalize_optional_text(executed_by)),
                    notes: Set(normalize_optional_text(notes)),
                    updated_at: Set(now),
                    ..Default::default()
                },
            )
            .await?;

        info!("Step {} marked done", id);
        Ok(step)
    }

    /// Skips a step. The reason is stored as given; callers are expected to
    /// require a non-blank one.
    pub async fn skip(&self, id: i32, reason: String) -> CoreResult<customer_steps::Model> {
        let step = self
            .transition(
                id,
                ACTIONABLE,
                customer_steps::ActiveModel {
                    status: Set(StepStatus::Skipped),
                    skip_reason: Set(Some(reason)),
                    updated_at: Set(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;

        info!("Step {} skipped", id);
        Ok(step)
    }

    /// Returns an acted-on step to an actionable state. `executed_at` is kept
    /// as a record of the earlier run; the reason replaces `notes`.
    pub async fn revert(
        &self,
        id: i32,
        reason: Option<String>,
    ) -> CoreResult<customer_steps::Model> {
        let step = self
            .transition(
                id,
                REVERTIBLE,
                customer_steps::ActiveModel {
                    status: Set(StepStatus::Reverted),
                    notes: Set(normalize_optional_text(reason)),
                    updated_at: Set(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;

        info!("Step {} reverted", id);
        Ok(step)
    }

    /// Replaces the content of a template-derived step for this customer only.
    pub async fn override_content(
        &self,
        id: i32,
        content: String,
    ) -> CoreResult<customer_steps::Model> {
        let step = find_step(&self.db, id).await?;
        if step.is_custom {
            return Err(CoreError::validation(
                "Custom steps are edited directly, not overridden",
            )
            .with_field("step_id", id));
        }
        if !step.is_template_derived() {
            return Err(CoreError::invalid_state(
                "Step is no longer linked to a template",
            )
            .with_field("step_id", id));
        }

        let mut active: customer_steps::ActiveModel = step.into();
        active.content = Set(content);
        active.is_overridden = Set(true);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&self.db).await?)
    }

    /// Copies name and content back from the linked template and clears the
    /// override flag.
    pub async fn reset_to_template(&self, id: i32) -> CoreResult<customer_steps::Model> {
        let (step, template) = customer_steps::Entity::find_by_id(id)
            .find_also_related(step_templates::Entity)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("CustomerStep", id))?;

        let template = template.ok_or_else(|| {
            CoreError::new(
                CoreErrorKind::NotFound,
                format!("Step {} has no template to reset to", id),
            )
            .with_field("step_id", id)
        })?;

        let mut active: customer_steps::ActiveModel = step.into();
        active.name = Set(template.name);
        active.content = Set(template.content);
        active.is_overridden = Set(false);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&self.db).await?)
    }

    /// Adds an ad-hoc step for one customer of an active release. With
    /// `add_to_template`, the step is also appended to the release templates
    /// so customers added later receive it; existing customers do not.
    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn add_custom_step(
        &self,
        release_id: i32,
        customer_id: i32,
        input: CustomStepInput,
    ) -> CoreResult<CustomStepOutcome> {
        let name = required_name(&input.name)?;
        let order_index = finite_index(input.order_index)?;

        let txn = self.db.begin().await?;
        touch_release(&txn, release_id, &[ReleaseStatus::Active]).await?;
        find_customer(&txn, customer_id).await?;

        let template = if input.add_to_template {
            let created = TemplateService::insert_template(
                &txn,
                NewTemplate {
                    release_id,
                    category: input.category,
                    name: name.clone(),
                    step_type: input.step_type,
                    content: input.content.clone(),
                    description: None,
                },
            )
            .await?;
            Some(created)
        } else {
            None
        };

        let now = Utc::now();
        let step = customer_steps::ActiveModel {
            release_id: Set(release_id),
            customer_id: Set(customer_id),
            template_id: Set(None),
            name: Set(name),
            category: Set(input.category),
            step_type: Set(input.step_type),
            content: Set(input.content),
            order_index: Set(order_index),
            status: Set(StepStatus::Pending),
            is_custom: Set(true),
            is_overridden: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        info!(
            "Added custom step {} for customer {} in release {}",
            step.id, customer_id, release_id
        );
        Ok(CustomStepOutcome { step, template })
    }

    pub async fn edit_custom_step(
        &self,
        id: i32,
        update: CustomStepUpdate,
    ) -> CoreResult<customer_steps::Model> {
        let step = self.find_custom(id).await?;
        let mut active: customer_steps::ActiveModel = step.into();

        if let Some(name) = update.name {
            active.name = Set(required_name(&name)?);
        }
        if let Some(category) = update.category {
            active.category = Set(category);
        }
        if let Some(step_type) = update.step_type {
            active.step_type = Set(step_type);
        }
        if let Some(content) = update.content {
            active.content = Set(content);
        }
        if let Some(order_index) = update.order_index {
            active.order_index = Set(finite_index(order_index)?);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&self.db).await?)
    }

    pub async fn delete_custom_step(&self, id: i32) -> CoreResult<()> {
        self.find_custom(id).await?;
        customer_steps::Entity::delete_by_id(id).exec(&self.db).await?;
        info!("Deleted custom step {}", id);
        Ok(())
    }

    async fn find_custom(&self, id: i32) -> CoreResult<customer_steps::Model> {
        let step = find_step(&self.db, id).await?;
        if !step.is_custom {
            return Err(CoreError::validation(
                "Only custom steps can be edited or deleted; use override or reset",
            )
            .with_field("step_id", id));
        }
        Ok(step)
    }

    /// Marks each step done independently. Failures are collected, never
    /// rolled back across ids.
    pub async fn bulk_mark_done(&self, ids: Vec<i32>, executed_by: Option<String>) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();

        for id in ids {
            match self.mark_done(id, None, executed_by.clone()).await {
                Ok(_) => outcome.succeeded.push(id),
                Err(err) => {
                    warn!("Bulk mark done failed for step {}: {}", id, err);
                    outcome.failed.push((id, err.message().to_string()));
                }
            }
        }

        info!(
            "Bulk mark done: {} succeeded, {} failed",
            outcome.succeeded.len(),
            outcome.failed.len()
        );
        outcome
    }

    pub async fn get_step(&self, id: i32) -> CoreResult<customer_steps::Model> {
        find_step(&self.db, id).await
    }

    pub async fn get_customer_steps(
        &self,
        release_id: i32,
        customer_id: i32,
    ) -> CoreResult<Vec<customer_steps::Model>> {
        Ok(customer_steps::Entity::find()
            .filter(customer_steps::Column::ReleaseId.eq(release_id))
            .filter(customer_steps::Column::CustomerId.eq(customer_id))
            .order_by_asc(customer_steps::Column::Category)
            .order_by_asc(customer_steps::Column::OrderIndex)
            .all(&self.db)
            .await?)
    }

    pub async fn get_step_with_details(&self, id: i32) -> CoreResult<StepDetails> {
        let (step, customer) = customer_steps::Entity::find_by_id(id)
            .find_also_related(customers::Entity)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("CustomerStep", id))?;

        let cluster = match &customer {
            Some(customer) => clusters::Entity::find_by_id(customer.cluster_id)
                .one(&self.db)
                .await?,
            None => None,
        };

        let template = match step.template_id {
            Some(template_id) => step_templates::Entity::find_by_id(template_id)
                .one(&self.db)
                .await?,
            None => None,
        };

        Ok(StepDetails {
            step,
            customer,
            cluster,
            template,
        })
    }

    pub async fn get_step_stats(&self, release_id: i32) -> CoreResult<StepStats> {
        find_release(&self.db, release_id).await?;

        let steps = customer_steps::Entity::find()
            .filter(customer_steps::Column::ReleaseId.eq(release_id))
            .all(&self.db)
            .await?;

        Ok(StepStats::from_statuses(steps.iter().map(|step| step.status)))
    }
}
