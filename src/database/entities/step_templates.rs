use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::{StepCategory, StepType};

/// Release-level step definition. `order_index` is unique per
/// `(release_id, category)`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "step_templates")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub release_id: i32,
    pub name: String,
    pub category: StepCategory,
    pub step_type: StepType,
    pub content: String,
    pub order_index: i32,
    pub description: Option<String>,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::releases::Entity",
        from = "Column::ReleaseId",
        to = "super::releases::Column::Id"
    )]
    Releases,
    #[sea_orm(has_many = "super::customer_steps::Entity")]
    CustomerSteps,
}

impl Related<super::releases::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Releases.def()
    }
}

impl Related<super::customer_steps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CustomerSteps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
