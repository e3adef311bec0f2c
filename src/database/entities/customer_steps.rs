use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::enums::{StepCategory, StepStatus, StepType};

/// Per-customer materialization of a step template, or an ad-hoc custom step
/// when `template_id` is `None`.
///
/// `(release_id, customer_id, template_id)` is unique; custom steps are exempt
/// because the store treats NULL template ids as distinct. `order_index` may be
/// fractional so custom steps can sit between template steps.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customer_steps")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub release_id: i32,
    pub customer_id: i32,
    pub template_id: Option<i32>,
    pub name: String,
    pub category: StepCategory,
    pub step_type: StepType,
    pub content: String,
    pub order_index: f64,
    pub status: StepStatus,
    pub executed_at: Option<ChronoDateTimeUtc>,
    pub executed_by: Option<String>,
    pub skip_reason: Option<String>,
    pub notes: Option<String>,
    pub is_custom: bool,
    pub is_overridden: bool,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::releases::Entity",
        from = "Column::ReleaseId",
        to = "super::releases::Column::Id"
    )]
    Releases,
    #[sea_orm(
        belongs_to = "super::customers::Entity",
        from = "Column::CustomerId",
        to = "super::customers::Column::Id"
    )]
    Customers,
    #[sea_orm(
        belongs_to = "super::step_templates::Entity",
        from = "Column::TemplateId",
        to = "super::step_templates::Column::Id"
    )]
    StepTemplates,
}

impl Related<super::releases::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Releases.def()
    }
}

impl Related<super::customers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customers.def()
    }
}

impl Related<super::step_templates::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StepTemplates.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_template_derived(&self) -> bool {
        self.template_id.is_some()
    }
}
