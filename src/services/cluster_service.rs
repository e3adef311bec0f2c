use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::common::normalize_optional_text;
use crate::database::entities::{clusters, customers};
use crate::errors::{CoreError, CoreResult};
use crate::services::lookup::find_cluster;

#[derive(Clone)]
pub struct ClusterService {
    db: DatabaseConnection,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ClusterInput {
    pub name: String,
    pub kubeconfig_path: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ClusterUpdate {
    pub name: Option<String>,
    pub kubeconfig_path: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ClusterWithCustomers {
    pub cluster: clusters::Model,
    pub customers: Vec<customers::Model>,
}

impl ClusterService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn validate_name(name: &str) -> CoreResult<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(CoreError::validation("Cluster name cannot be empty"));
        }
        Ok(trimmed.to_string())
    }

    pub async fn create_cluster(&self, input: ClusterInput) -> CoreResult<clusters::Model> {
        let name = Self::validate_name(&input.name)?;
        let now = Utc::now();

        let cluster = clusters::ActiveModel {
            name: Set(name),
            kubeconfig_path: Set(normalize_optional_text(input.kubeconfig_path)),
            description: Set(normalize_optional_text(input.description)),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let created = cluster.insert(&self.db).await?;
        info!("Created cluster {} ({})", created.id, created.name);
        Ok(created)
    }

    pub async fn update_cluster(
        &self,
        id: i32,
        update: ClusterUpdate,
    ) -> CoreResult<clusters::Model> {
        let cluster = find_cluster(&self.db, id).await?;
        let mut active: clusters::ActiveModel = cluster.into();

        if let Some(name) = update.name {
            active.name = Set(Self::validate_name(&name)?);
        }
        if let Some(path) = update.kubeconfig_path {
            active.kubeconfig_path = Set(normalize_optional_text(Some(path)));
        }
        if let Some(description) = update.description {
            active.description = Set(normalize_optional_text(Some(description)));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&self.db).await?)
    }

    /// Deactivates a cluster. Clusters that still own active customers are
    /// refused; the row itself is never removed.
    pub async fn delete_cluster(&self, id: i32) -> CoreResult<()> {
        let cluster = find_cluster(&self.db, id).await?;

        let active_customers = customers::Entity::find()
            .filter(customers::Column::ClusterId.eq(id))
            .filter(customers::Column::IsActive.eq(true))
            .count(&self.db)
            .await?;

        if active_customers > 0 {
            return Err(CoreError::validation(format!(
                "Cannot delete cluster: {} active customer(s) exist",
                active_customers
            ))
            .with_field("cluster_id", id)
            .with_field("active_customers", active_customers));
        }

        let mut active: clusters::ActiveModel = cluster.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await?;

        info!("Deactivated cluster {}", id);
        Ok(())
    }

    pub async fn list_clusters(&self) -> CoreResult<Vec<clusters::Model>> {
        Ok(clusters::Entity::find()
            .filter(clusters::Column::IsActive.eq(true))
            .order_by_asc(clusters::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn get_cluster(&self, id: i32) -> CoreResult<clusters::Model> {
        find_cluster(&self.db, id).await
    }

    pub async fn get_cluster_with_customers(&self, id: i32) -> CoreResult<ClusterWithCustomers> {
        let cluster = find_cluster(&self.db, id).await?;
        let customers = customers::Entity::find()
            .filter(customers::Column::ClusterId.eq(id))
            .filter(customers::Column::IsActive.eq(true))
            .order_by_asc(customers::Column::Name)
            .all(&self.db)
            .await?;

        Ok(ClusterWithCustomers { cluster, customers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::setup_test_db;
    use crate::errors::CoreErrorKind;

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let service = ClusterService::new(setup_test_db().await);
        let err = service
            .create_cluster(ClusterInput {
                name: "   ".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::Validation);
    }

    #[tokio::test]
    async fn duplicate_name_is_a_constraint_violation() {
        let service = ClusterService::new(setup_test_db().await);
        let input = ClusterInput {
            name: "prod-eu".to_string(),
            ..Default::default()
        };
        service.create_cluster(input.clone()).await.unwrap();

        let err = service.create_cluster(input).await.unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::ConstraintViolation);
    }

    #[tokio::test]
    async fn deleted_clusters_drop_out_of_listing() {
        let service = ClusterService::new(setup_test_db().await);
        let b = service
            .create_cluster(ClusterInput {
                name: "b-cluster".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        service
            .create_cluster(ClusterInput {
                name: "a-cluster".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        let names: Vec<String> = service
            .list_clusters()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["a-cluster", "b-cluster"]);

        service.delete_cluster(b.id).await.unwrap();
        assert_eq!(service.list_clusters().await.unwrap().len(), 1);
        assert!(!service.get_cluster(b.id).await.unwrap().is_active);
    }
}
