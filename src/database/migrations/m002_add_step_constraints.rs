use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One namespace per cluster
        manager
            .create_index(
                Index::create()
                    .name("idx_customers_cluster_namespace_unique")
                    .table(Customers::Table)
                    .col(Customers::ClusterId)
                    .col(Customers::Namespace)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // No two templates at the same position within a release/category
        manager
            .create_index(
                Index::create()
                    .name("idx_step_templates_release_category_order_unique")
                    .table(StepTemplates::Table)
                    .col(StepTemplates::ReleaseId)
                    .col(StepTemplates::Category)
                    .col(StepTemplates::OrderIndex)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // A customer receives each template at most once. NULL template ids
        // (custom steps) compare as distinct and are not constrained.
        manager
            .create_index(
                Index::create()
                    .name("idx_customer_steps_release_customer_template_unique")
                    .table(CustomerSteps::Table)
                    .col(CustomerSteps::ReleaseId)
                    .col(CustomerSteps::CustomerId)
                    .col(CustomerSteps::TemplateId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_customer_steps_template_id")
                    .table(CustomerSteps::Table)
                    .col(CustomerSteps::TemplateId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_customer_steps_release_status")
                    .table(CustomerSteps::Table)
                    .col(CustomerSteps::ReleaseId)
                    .col(CustomerSteps::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_customer_steps_release_status")
                    .table(CustomerSteps::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_customer_steps_template_id")
                    .table(CustomerSteps::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_customer_steps_release_customer_template_unique")
                    .table(CustomerSteps::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_step_templates_release_category_order_unique")
                    .table(StepTemplates::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_customers_cluster_namespace_unique")
                    .table(Customers::Table)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Customers {
    Table,
    ClusterId,
    Namespace,
}

#[derive(Iden)]
enum StepTemplates {
    Table,
    ReleaseId,
    Category,
    OrderIndex,
}

#[derive(Iden)]
enum CustomerSteps {
    Table,
    ReleaseId,
    CustomerId,
    TemplateId,
    Status,
}
