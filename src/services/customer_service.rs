use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::common::normalize_optional_text;
use crate::database::entities::{clusters, customers};
use crate::errors::{CoreError, CoreResult};
use crate::services::lookup::{find_cluster, find_customer};

#[derive(Clone)]
pub struct CustomerService {
    db: DatabaseConnection,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CustomerInput {
    pub cluster_id: i32,
    pub namespace: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CustomerUpdate {
    pub cluster_id: Option<i32>,
    pub namespace: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CustomerWithCluster {
    #[serde(flatten)]
    pub customer: customers::Model,
    pub cluster: Option<clusters::Model>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ClusterCustomers {
    pub cluster: Option<clusters::Model>,
    pub customers: Vec<customers::Model>,
}

fn required(field: &str, value: &str) -> CoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation(format!("Customer {} cannot be empty", field)));
    }
    Ok(trimmed.to_string())
}

impl CustomerService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create_customer(&self, input: CustomerInput) -> CoreResult<customers::Model> {
        let namespace = required("namespace", &input.namespace)?;
        let name = required("name", &input.name)?;
        find_cluster(&self.db, input.cluster_id).await?;

        let now = Utc::now();
        let customer = customers::ActiveModel {
            cluster_id: Set(input.cluster_id),
            namespace: Set(namespace),
            name: Set(name),
            description: Set(normalize_optional_text(input.description)),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let created = customer.insert(&self.db).await?;
        info!(
            "Created customer {} ({}) in cluster {}",
            created.id, created.namespace, created.cluster_id
        );
        Ok(created)
    }

    pub async fn update_customer(
        &self,
        id: i32,
        update: CustomerUpdate,
    ) -> CoreResult<customers::Model> {
        let customer = find_customer(&self.db, id).await?;
        let mut active: customers::ActiveModel = customer.into();

        if let Some(cluster_id) = update.cluster_id {
            find_cluster(&self.db, cluster_id).await?;
            active.cluster_id = Set(cluster_id);
        }
        if let Some(namespace) = update.namespace {
            active.namespace = Set(required("namespace", &namespace)?);
        }
        if let Some(name) = update.name {
            active.name = Set(required("name", &name)?);
        }
        if let Some(description) = update.description {
            active.description = Set(normalize_optional_text(Some(description)));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&self.db).await?)
    }

    /// Soft delete; the customer keeps its historical steps.
    pub async fn delete_customer(&self, id: i32) -> CoreResult<()> {
        let customer = find_customer(&self.db, id).await?;
        let mut active: customers::ActiveModel = customer.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await?;

        info!("Deactivated customer {}", id);
        Ok(())
    }

    pub async fn list_customers(&self) -> CoreResult<Vec<CustomerWithCluster>> {
        let rows = customers::Entity::find()
            .filter(customers::Column::IsActive.eq(true))
            .find_also_related(clusters::Entity)
            .order_by_asc(customers::Column::Name)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(customer, cluster)| CustomerWithCluster { customer, cluster })
            .collect())
    }

    pub async fn list_customers_by_cluster(
        &self,
        cluster_id: i32,
    ) -> CoreResult<Vec<customers::Model>> {
        Ok(customers::Entity::find()
            .filter(customers::Column::ClusterId.eq(cluster_id))
            .filter(customers::Column::IsActive.eq(true))
            .order_by_asc(customers::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn get_customer(&self, id: i32) -> CoreResult<CustomerWithCluster> {
        let (customer, cluster) = customers::Entity::find_by_id(id)
            .find_also_related(clusters::Entity)
            .one(&self.db)
            .await?
            .ok_or_else(|| CoreError::not_found("Customer", id))?;

        Ok(CustomerWithCluster { customer, cluster })
    }

    /// Active customers bucketed by cluster, clusters ordered by name.
    pub async fn get_customers_grouped_by_cluster(&self) -> CoreResult<Vec<ClusterCustomers>> {
        let mut grouped: BTreeMap<(String, i32), ClusterCustomers> = BTreeMap::new();

        for entry in self.list_customers().await? {
            let key = match &entry.cluster {
                Some(cluster) => (cluster.name.clone(), cluster.id),
                None => ("Unknown".to_string(), 0),
            };
            grouped
                .entry(key)
                .or_insert_with(|| ClusterCustomers {
                    cluster: entry.cluster.clone(),
                    customers: Vec::new(),
                })
                .customers
                .push(entry.customer);
        }

        Ok(grouped.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::setup_test_db;
    use crate::errors::CoreErrorKind;
    use crate::services::{ClusterInput, ClusterService};

    async fn cluster(db: &DatabaseConnection, name: &str) -> clusters::Model {
        ClusterService::new(db.clone())
            .create_cluster(ClusterInput {
                name: name.to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
    }

    fn input(cluster_id: i32, namespace: &str, name: &str) -> CustomerInput {
        CustomerInput {
            cluster_id,
            namespace: namespace.to_string(),
            name: name.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn namespace_is_unique_within_cluster_only() {
        let db = setup_test_db().await;
        let east = cluster(&db, "east").await;
        let west = cluster(&db, "west").await;
        let service = CustomerService::new(db);

        service.create_customer(input(east.id, "acme", "Acme")).await.unwrap();
        service.create_customer(input(west.id, "acme", "Acme West")).await.unwrap();

        let err = service
            .create_customer(input(east.id, "acme", "Acme Again"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::ConstraintViolation);
    }

    #[tokio::test]
    async fn unknown_cluster_is_not_found() {
        let service = CustomerService::new(setup_test_db().await);
        let err = service
            .create_customer(input(99, "acme", "Acme"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), CoreErrorKind::NotFound);
    }

    #[tokio::test]
    async fn grouped_by_cluster_skips_inactive_customers() {
        let db = setup_test_db().await;
        let east = cluster(&db, "east").await;
        let west = cluster(&db, "west").await;
        let service = CustomerService::new(db);

        service.create_customer(input(west.id, "w1", "Wendy")).await.unwrap();
        let gone = service.create_customer(input(east.id, "e1", "Eve")).await.unwrap();
        service.create_customer(input(east.id, "e2", "Ed")).await.unwrap();
        service.delete_customer(gone.id).await.unwrap();

        let grouped = service.get_customers_grouped_by_cluster().await.unwrap();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].cluster.as_ref().unwrap().name, "east");
        assert_eq!(grouped[0].customers.len(), 1);
        assert_eq!(grouped[0].customers[0].namespace, "e2");
        assert_eq!(grouped[1].customers[0].namespace, "w1");
    }
}
