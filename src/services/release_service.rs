use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::common::normalize_optional_text;
use crate::database::entities::{
    customer_steps, releases, step_templates, ReleaseStatus, ReleaseType, StepStatus,
};
use crate::errors::{CoreError, CoreResult};
use crate::services::lookup::{find_release, touch_release};

#[derive(Clone)]
pub struct ReleaseService {
    db: DatabaseConnection,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReleaseInput {
    pub name: String,
    pub release_type: ReleaseType,
    pub version_number: Option<String>,
    pub release_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ReleaseUpdate {
    pub name: Option<String>,
    pub release_type: Option<ReleaseType>,
    pub version_number: Option<String>,
    pub release_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReleaseWithTemplates {
    #[serde(flatten)]
    pub release: releases::Model,
    pub templates: Vec<step_templates::Model>,
}

/// Dashboard counters across every release.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReleaseStats {
    pub total_releases: u64,
    pub active_releases: u64,
    pub pending_steps: u64,
    pub done_steps: u64,
    pub skipped_steps: u64,
}

pub(crate) fn clone_description(original_name: &str, description: Option<&str>) -> String {
    format!(
        "Cloned from: {}\n\n{}",
        original_name,
        description.unwrap_or_default()
    )
}

impl ReleaseService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn validate_name(name: &str) -> CoreResult<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(CoreError::validation("Release name cannot be empty"));
        }
        Ok(trimmed.to_string())
    }

    pub async fn create_release(&self, input: ReleaseInput) -> CoreResult<releases::Model> {
        let name = Self::validate_name(&input.name)?;
        let now = Utc::now();

        let release = releases::ActiveModel {
            name: Set(name),
            release_type: Set(input.release_type),
            status: Set(ReleaseStatus::Draft),
            version_number: Set(normalize_optional_text(input.version_number)),
            release_date: Set(input.release_date),
            description: Set(normalize_optional_text(input.description)),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let created = release.insert(&self.db).await?;
        info!("Created draft release {} ({})", created.id, created.name);
        Ok(created)
    }

    /// Updates descriptive fields. Status only changes through activation and
    /// archiving.
    pub async fn update_release(
        &self,
        id: i32,
        update: ReleaseUpdate,
    ) -> CoreResult<releases::Model> {
        let release = find_release(&self.db, id).await?;
        let mut active: releases::ActiveModel = release.into();

        if let Some(name) = update.name {
            active.name = Set(Self::validate_name(&name)?);
        }
        if let Some(release_type) = update.release_type {
            active.release_type = Set(release_type);
        }
        if let Some(version_number) = update.version_number {
            active.version_number = Set(normalize_optional_text(Some(version_number)));
        }
        if let Some(release_date) = update.release_date {
            active.release_date = Set(Some(release_date));
        }
        if let Some(description) = update.description {
            active.description = Set(normalize_optional_text(Some(description)));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&self.db).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn archive_release(&self, id: i32) -> CoreResult<releases::Model> {
        let txn = self.db.begin().await?;
        touch_release(&txn, id, &[ReleaseStatus::Active]).await?;

        let release = find_release(&txn, id).await?;
        let mut active: releases::ActiveModel = release.into();
        active.status = Set(ReleaseStatus::Archived);
        let archived = active.update(&txn).await?;

        txn.commit().await?;
        info!("Archived release {}", id);
        Ok(archived)
    }

    /// Removes the release; its templates and customer steps go with it.
    pub async fn delete_release(&self, id: i32) -> CoreResult<()> {
        let result = releases::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(CoreError::not_found("Release", id));
        }
        info!("Deleted release {}", id);
        Ok(())
    }

    pub async fn list_releases(&self) -> CoreResult<Vec<releases::Model>> {
        Ok(releases::Entity::find()
            .order_by_desc(releases::Column::CreatedAt)
            .order_by_desc(releases::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn get_active_releases(&self) -> CoreResult<Vec<releases::Model>> {
        Ok(releases::Entity::find()
            .filter(releases::Column::Status.eq(ReleaseStatus::Active))
            .order_by_desc(releases::Column::CreatedAt)
            .order_by_desc(releases::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn get_release(&self, id: i32) -> CoreResult<releases::Model> {
        find_release(&self.db, id).await
    }

    pub async fn get_release_with_templates(&self, id: i32) -> CoreResult<ReleaseWithTemplates> {
        let release = find_release(&self.db, id).await?;
        let templates = step_templates::Entity::find()
            .filter(step_templates::Column::ReleaseId.eq(id))
            .order_by_asc(step_templates::Column::Category)
            .order_by_asc(step_templates::Column::OrderIndex)
            .all(&self.db)
            .await?;

        Ok(ReleaseWithTemplates { release, templates })
    }

    /// Deep-copies a release's templates into a new draft release.
    #[tracing::instrument(skip(self))]
    pub async fn clone_release(&self, id: i32, new_name: &str) -> CoreResult<releases::Model> {
        let name = Self::validate_name(new_name)?;
        let txn = self.db.begin().await?;

        let original = find_release(&txn, id).await?;
        let templates = step_templates::Entity::find()
            .filter(step_templates::Column::ReleaseId.eq(id))
            .all(&txn)
            .await?;

        let now = Utc::now();
        let cloned = releases::ActiveModel {
            name: Set(name),
            release_type: Set(original.release_type),
            status: Set(ReleaseStatus::Draft),
            version_number: Set(original.version_number.clone()),
            release_date: Set(None),
            description: Set(Some(clone_description(
                &original.name,
                original.description.as_deref(),
            ))),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let copies: Vec<step_templates::ActiveModel> = templates
            .iter()
            .map(|template| step_templates::ActiveModel {
                release_id: Set(cloned.id),
                name: Set(template.name.clone()),
                category: Set(template.category),
                step_type: Set(template.step_type),
                content: Set(template.content.clone()),
                order_index: Set(template.order_index),
                description: Set(template.description.clone()),
                created_at: Set(now),
                ..Default::default()
            })
            .collect();

        if !copies.is_empty() {
            step_templates::Entity::insert_many(copies).exec(&txn).await?;
        }

        txn.commit().await?;
        info!(
            "Cloned release {} into {} with {} template(s)",
            id,
            cloned.id,
            templates.len()
        );
        Ok(cloned)
    }

    pub async fn get_release_stats(&self) -> CoreResult<ReleaseStats> {
        let total_releases = releases::Entity::find().count(&self.db).await?;
        let active_releases = releases::Entity::find()
            .filter(releases::Column::Status.eq(ReleaseStatus::Active))
            .count(&self.db)
            .await?;

        let count_steps = |status: StepStatus| {
            customer_steps::Entity::find()
                .filter(customer_steps::Column::Status.eq(status))
                .count(&self.db)
        };

        Ok(ReleaseStats {
            total_releases,
            active_releases,
            pending_steps: count_steps(StepStatus::Pending).await?,
            done_steps: count_steps(StepStatus::Done).await?,
            skipped_steps: count_steps(StepStatus::Skipped).await?,
        })
    }
}
