use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::{ReleaseStatus, ReleaseType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "releases")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub release_type: ReleaseType,
    pub status: ReleaseStatus,
    pub version_number: Option<String>,
    pub release_date: Option<ChronoDateTimeUtc>,
    pub description: Option<String>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::step_templates::Entity")]
    StepTemplates,
    #[sea_orm(has_many = "super::customer_steps::Entity")]
    CustomerSteps,
}

impl Related<super::step_templates::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StepTemplates.def()
    }
}

impl Related<super::customer_steps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CustomerSteps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_draft(&self) -> bool {
        self.status == ReleaseStatus::Draft
    }

    pub fn is_active(&self) -> bool {
        self.status == ReleaseStatus::Active
    }

    pub fn is_archived(&self) -> bool {
        self.status == ReleaseStatus::Archived
    }
}
