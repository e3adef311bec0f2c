//! Read-side projections of a release's customer steps: cluster to customer to
//! steps, and the per-category matrix whose rows are distinct step identities.

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use crate::database::entities::{clusters, customer_steps, customers, StepCategory};
use crate::errors::CoreResult;
use crate::services::lookup::find_release;

#[derive(Clone)]
pub struct MatrixService {
    db: DatabaseConnection,
}

#[derive(Clone, Debug, Serialize)]
pub struct CustomerStepGroup {
    pub customer: customers::Model,
    pub steps: Vec<customer_steps::Model>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ClusterSteps {
    pub cluster: Option<clusters::Model>,
    pub customers: Vec<CustomerStepGroup>,
}

/// Identity of a matrix row. Template-derived steps share a row across
/// customers; each custom step is its own row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum StepKey {
    Template(i32),
    Custom(i32),
}

impl StepKey {
    pub fn of(step: &customer_steps::Model) -> Self {
        match step.template_id {
            Some(template_id) => StepKey::Template(template_id),
            None => StepKey::Custom(step.id),
        }
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKey::Template(id) => write!(f, "template-{}", id),
            StepKey::Custom(id) => write!(f, "custom-{}", id),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MatrixRow {
    pub key: StepKey,
    pub name: String,
    pub order_index: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct MatrixColumn {
    pub customer: customers::Model,
    /// Aligned with the rows; `None` where the customer has no such step.
    pub cells: Vec<Option<customer_steps::Model>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ClusterMatrix {
    pub cluster: Option<clusters::Model>,
    pub category: StepCategory,
    pub rows: Vec<MatrixRow>,
    pub customers: Vec<MatrixColumn>,
}

fn step_order(a: &customer_steps::Model, b: &customer_steps::Model) -> Ordering {
    a.category
        .cmp(&b.category)
        .then_with(|| a.order_index.total_cmp(&b.order_index))
        .then_with(|| a.id.cmp(&b.id))
}

/// Groups steps by cluster (ordered by name) and customer (ordered by name);
/// steps within a customer are ordered by category then order index.
pub fn group_by_cluster(
    steps: Vec<customer_steps::Model>,
    customers: &[customers::Model],
    clusters: &[clusters::Model],
) -> Vec<ClusterSteps> {
    let customers_by_id: HashMap<i32, &customers::Model> =
        customers.iter().map(|customer| (customer.id, customer)).collect();
    let clusters_by_id: HashMap<i32, &clusters::Model> =
        clusters.iter().map(|cluster| (cluster.id, cluster)).collect();

    let mut grouped: BTreeMap<(String, i32), BTreeMap<(String, i32), CustomerStepGroup>> =
        BTreeMap::new();

    for step in steps {
        let Some(customer) = customers_by_id.get(&step.customer_id) else {
            continue;
        };
        let cluster_key = match clusters_by_id.get(&customer.cluster_id) {
            Some(cluster) => (cluster.name.clone(), cluster.id),
            None => ("Unknown".to_string(), 0),
        };

        grouped
            .entry(cluster_key)
            .or_default()
            .entry((customer.name.clone(), customer.id))
            .or_insert_with(|| CustomerStepGroup {
                customer: (*customer).clone(),
                steps: Vec::new(),
            })
            .steps
            .push(step);
    }

    grouped
        .into_iter()
        .map(|((_, cluster_id), customers)| ClusterSteps {
            cluster: clusters_by_id.get(&cluster_id).map(|cluster| (*cluster).clone()),
            customers: customers
                .into_values()
                .map(|mut group| {
                    group.steps.sort_by(step_order);
                    group
                })
                .collect(),
        })
        .collect()
}

/// Builds one matrix per cluster for `category`. Rows are the distinct step
/// keys across that cluster's customers, ordered by order index.
pub fn project_matrix(groups: &[ClusterSteps], category: StepCategory) -> Vec<ClusterMatrix> {
    groups
        .iter()
        .map(|group| {
            let mut seen = HashSet::new();
            let mut rows: Vec<MatrixRow> = group
                .customers
                .iter()
                .flat_map(|customer| customer.steps.iter())
                .filter(|step| step.category == category)
                .filter_map(|step| {
                    let key = StepKey::of(step);
                    seen.insert(key).then(|| MatrixRow {
                        key,
                        name: step.name.clone(),
                        order_index: step.order_index,
                    })
                })
                .collect();
            rows.sort_by(|a, b| {
                a.order_index
                    .total_cmp(&b.order_index)
                    .then_with(|| a.key.cmp(&b.key))
            });

            let customers = group
                .customers
                .iter()
                .map(|customer| {
                    let by_key: HashMap<StepKey, &customer_steps::Model> = customer
                        .steps
                        .iter()
                        .filter(|step| step.category == category)
                        .map(|step| (StepKey::of(step), step))
                        .collect();
                    MatrixColumn {
                        customer: customer.customer.clone(),
                        cells: rows
                            .iter()
                            .map(|row| by_key.get(&row.key).map(|step| (*step).clone()))
                            .collect(),
                    }
                })
                .collect();

            ClusterMatrix {
                cluster: group.cluster.clone(),
                category,
                rows,
                customers,
            }
        })
        .collect()
}

impl MatrixService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_release_steps_grouped_by_cluster(
        &self,
        release_id: i32,
    ) -> CoreResult<Vec<ClusterSteps>> {
        find_release(&self.db, release_id).await?;

        let steps = customer_steps::Entity::find()
            .filter(customer_steps::Column::ReleaseId.eq(release_id))
            .all(&self.db)
            .await?;

        let customer_ids: HashSet<i32> = steps.iter().map(|step| step.customer_id).collect();
        let customers = customers::Entity::find()
            .filter(customers::Column::Id.is_in(customer_ids))
            .all(&self.db)
            .await?;

        let cluster_ids: HashSet<i32> = customers.iter().map(|customer| customer.cluster_id).collect();
        let clusters = clusters::Entity::find()
            .filter(clusters::Column::Id.is_in(cluster_ids))
            .all(&self.db)
            .await?;

        Ok(group_by_cluster(steps, &customers, &clusters))
    }

    /// Same data flattened to one group per customer, ordered by cluster then
    /// customer name.
    pub async fn get_release_steps_by_customer(
        &self,
        release_id: i32,
    ) -> CoreResult<Vec<CustomerStepGroup>> {
        Ok(self
            .get_release_steps_grouped_by_cluster(release_id)
            .await?
            .into_iter()
            .flat_map(|cluster| cluster.customers)
            .collect())
    }

    pub async fn build_matrix(
        &self,
        release_id: i32,
        category: StepCategory,
    ) -> CoreResult<Vec<ClusterMatrix>> {
        let groups = self.get_release_steps_grouped_by_cluster(release_id).await?;
        Ok(project_matrix(&groups, category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::entities::{StepStatus, StepType};
    use chrono::Utc;

    fn cluster(id: i32, name: &str) -> clusters::Model {
        clusters::Model {
            id,
            name: name.to_string(),
            kubeconfig_path: None,
            description: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn customer(id: i32, cluster_id: i32, name: &str) -> customers::Model {
        customers::Model {
            id,
            cluster_id,
            namespace: name.to_lowercase(),
            name: name.to_string(),
            description: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn step(
        id: i32,
        customer_id: i32,
        template_id: Option<i32>,
        category: StepCategory,
        order_index: f64,
    ) -> customer_steps::Model {
        customer_steps::Model {
            id,
            release_id: 1,
            customer_id,
            template_id,
            name: format!("step {}", id),
            category,
            step_type: StepType::Bash,
            content: String::new(),
            order_index,
            status: StepStatus::Pending,
            executed_at: None,
            executed_by: None,
            skip_reason: None,
            notes: None,
            is_custom: template_id.is_none(),
            is_overridden: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn groups_and_sorts_steps() {
        let clusters = vec![cluster(1, "west"), cluster(2, "east")];
        let customers = vec![customer(10, 1, "Wanda"), customer(20, 2, "Eli")];
        let steps = vec![
            step(1, 10, Some(100), StepCategory::Verify, 0.0),
            step(2, 10, Some(101), StepCategory::Deploy, 1.0),
            step(3, 10, Some(102), StepCategory::Deploy, 0.0),
            step(4, 20, Some(102), StepCategory::Deploy, 0.0),
        ];

        let grouped = group_by_cluster(steps, &customers, &clusters);

        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].cluster.as_ref().unwrap().name, "east");
        let wanda = &grouped[1].customers[0];
        let ids: Vec<i32> = wanda.steps.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn matrix_dedups_template_steps_and_keeps_custom_steps_apart() {
        let clusters = vec![cluster(1, "prod")];
        let customers = vec![customer(10, 1, "Acme"), customer(11, 1, "Beta")];
        let steps = vec![
            step(1, 10, Some(100), StepCategory::Deploy, 0.0),
            step(2, 10, Some(101), StepCategory::Deploy, 1.0),
            step(3, 11, Some(100), StepCategory::Deploy, 0.0),
            step(4, 11, Some(101), StepCategory::Deploy, 1.0),
            step(5, 11, None, StepCategory::Deploy, 0.5),
            step(6, 10, Some(200), StepCategory::Verify, 0.0),
        ];

        let groups = group_by_cluster(steps, &customers, &clusters);
        let matrix = project_matrix(&groups, StepCategory::Deploy);

        assert_eq!(matrix.len(), 1);
        let keys: Vec<StepKey> = matrix[0].rows.iter().map(|row| row.key).collect();
        assert_eq!(
            keys,
            vec![
                StepKey::Template(100),
                StepKey::Custom(5),
                StepKey::Template(101)
            ]
        );

        let acme = &matrix[0].customers[0];
        assert_eq!(acme.customer.name, "Acme");
        assert_eq!(acme.cells[0].as_ref().map(|s| s.id), Some(1));
        assert!(acme.cells[1].is_none());
        assert_eq!(acme.cells[2].as_ref().map(|s| s.id), Some(2));

        let beta = &matrix[0].customers[1];
        assert_eq!(beta.cells[1].as_ref().map(|s| s.id), Some(5));
    }

    #[test]
    fn step_key_display() {
        assert_eq!(StepKey::Template(3).to_string(), "template-3");
        assert_eq!(StepKey::Custom(9).to_string(), "custom-9");
    }
}
