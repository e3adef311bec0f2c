//! Find-or-NotFound helpers usable with a connection or an open transaction.

use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::database::entities::{
    clusters, customer_steps, customers, releases, step_templates, ReleaseStatus,
};
use crate::errors::{CoreError, CoreResult};

pub(crate) async fn find_cluster<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> CoreResult<clusters::Model> {
    clusters::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| CoreError::not_found("Cluster", id))
}

pub(crate) async fn find_customer<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> CoreResult<customers::Model> {
    customers::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| CoreError::not_found("Customer", id))
}

pub(crate) async fn find_release<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> CoreResult<releases::Model> {
    releases::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| CoreError::not_found("Release", id))
}

pub(crate) async fn find_template<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> CoreResult<step_templates::Model> {
    step_templates::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| CoreError::not_found("StepTemplate", id))
}

pub(crate) async fn find_step<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> CoreResult<customer_steps::Model> {
    customer_steps::Entity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| CoreError::not_found("CustomerStep", id))
}

/// Bumps `updated_at` on a release, optionally only when it is in one of
/// `allowed` statuses.
///
/// Inside a transaction this is issued first so the transaction takes the
/// store's write lock before it reads anything; concurrent writers on the
/// same release then queue behind each other instead of failing on lock
/// upgrade. Returns an error describing why no row matched.
pub(crate) async fn touch_release<C: ConnectionTrait>(
    conn: &C,
    id: i32,
    allowed: &[ReleaseStatus],
) -> CoreResult<()> {
    let mut update = releases::Entity::update_many()
        .set(releases::ActiveModel {
            updated_at: Set(Utc::now()),
            ..Default::default()
        })
        .filter(releases::Column::Id.eq(id));

    if !allowed.is_empty() {
        update = update.filter(releases::Column::Status.is_in(allowed.iter().copied()));
    }

    let result = update.exec(conn).await?;
    if result.rows_affected > 0 {
        return Ok(());
    }

    let release = find_release(conn, id).await?;
    Err(CoreError::invalid_state(format!(
        "Release {} is {:?}; expected one of {:?}",
        id, release.status, allowed
    ))
    .with_field("release_id", id))
}
