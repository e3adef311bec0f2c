use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A tenant namespace inside a cluster. `(cluster_id, namespace)` is unique.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub cluster_id: i32,
    pub namespace: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::clusters::Entity",
        from = "Column::ClusterId",
        to = "super::clusters::Column::Id"
    )]
    Clusters,
    #[sea_orm(has_many = "super::customer_steps::Entity")]
    CustomerSteps,
}

impl Related<super::clusters::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Clusters.def()
    }
}

impl Related<super::customer_steps::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CustomerSteps.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
