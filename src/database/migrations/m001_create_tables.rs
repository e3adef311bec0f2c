use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Clusters::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Clusters::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Clusters::Name).text().not_null().unique_key())
                    .col(ColumnDef::new(Clusters::KubeconfigPath).text())
                    .col(ColumnDef::new(Clusters::Description).text())
                    .col(
                        ColumnDef::new(Clusters::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Clusters::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Clusters::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Customers cannot outlive their cluster row
        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Customers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Customers::ClusterId).integer().not_null())
                    .col(ColumnDef::new(Customers::Namespace).text().not_null())
                    .col(ColumnDef::new(Customers::Name).text().not_null())
                    .col(ColumnDef::new(Customers::Description).text())
                    .col(
                        ColumnDef::new(Customers::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Customers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Customers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customers_cluster_id")
                            .from(Customers::Table, Customers::ClusterId)
                            .to(Clusters::Table, Clusters::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Releases::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Releases::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Releases::Name).text().not_null())
                    .col(ColumnDef::new(Releases::ReleaseType).text().not_null())
                    .col(
                        ColumnDef::new(Releases::Status)
                            .text()
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(Releases::VersionNumber).text())
                    .col(ColumnDef::new(Releases::ReleaseDate).timestamp_with_time_zone())
                    .col(ColumnDef::new(Releases::Description).text())
                    .col(
                        ColumnDef::new(Releases::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Releases::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StepTemplates::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StepTemplates::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StepTemplates::ReleaseId).integer().not_null())
                    .col(ColumnDef::new(StepTemplates::Name).text().not_null())
                    .col(ColumnDef::new(StepTemplates::Category).text().not_null())
                    .col(ColumnDef::new(StepTemplates::StepType).text().not_null())
                    .col(ColumnDef::new(StepTemplates::Content).text().not_null())
                    .col(ColumnDef::new(StepTemplates::OrderIndex).integer().not_null())
                    .col(ColumnDef::new(StepTemplates::Description).text())
                    .col(
                        ColumnDef::new(StepTemplates::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_step_templates_release_id")
                            .from(StepTemplates::Table, StepTemplates::ReleaseId)
                            .to(Releases::Table, Releases::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(CustomerSteps::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CustomerSteps::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CustomerSteps::ReleaseId).integer().not_null())
                    .col(ColumnDef::new(CustomerSteps::CustomerId).integer().not_null())
                    .col(ColumnDef::new(CustomerSteps::TemplateId).integer())
                    .col(ColumnDef::new(CustomerSteps::Name).text().not_null())
                    .col(ColumnDef::new(CustomerSteps::Category).text().not_null())
                    .col(ColumnDef::new(CustomerSteps::StepType).text().not_null())
                    .col(ColumnDef::new(CustomerSteps::Content).text().not_null())
                    .col(ColumnDef::new(CustomerSteps::OrderIndex).double().not_null())
                    .col(
                        ColumnDef::new(CustomerSteps::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(CustomerSteps::ExecutedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(CustomerSteps::ExecutedBy).text())
                    .col(ColumnDef::new(CustomerSteps::SkipReason).text())
                    .col(ColumnDef::new(CustomerSteps::Notes).text())
                    .col(
                        ColumnDef::new(CustomerSteps::IsCustom)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(CustomerSteps::IsOverridden)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(CustomerSteps::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CustomerSteps::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customer_steps_release_id")
                            .from(CustomerSteps::Table, CustomerSteps::ReleaseId)
                            .to(Releases::Table, Releases::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customer_steps_customer_id")
                            .from(CustomerSteps::Table, CustomerSteps::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    // Executed steps keep their row when the template goes away
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_customer_steps_template_id")
                            .from(CustomerSteps::Table, CustomerSteps::TemplateId)
                            .to(StepTemplates::Table, StepTemplates::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CustomerSteps::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(StepTemplates::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Releases::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Customers::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Clusters::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Clusters {
    Table,
    Id,
    Name,
    KubeconfigPath,
    Description,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Customers {
    Table,
    Id,
    ClusterId,
    Namespace,
    Name,
    Description,
    IsActive,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Releases {
    Table,
    Id,
    Name,
    ReleaseType,
    Status,
    VersionNumber,
    ReleaseDate,
    Description,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum StepTemplates {
    Table,
    Id,
    ReleaseId,
    Name,
    Category,
    StepType,
    Content,
    OrderIndex,
    Description,
    CreatedAt,
}

#[derive(Iden)]
enum CustomerSteps {
    Table,
    Id,
    ReleaseId,
    CustomerId,
    TemplateId,
    Name,
    Category,
    StepType,
    Content,
    OrderIndex,
    Status,
    ExecutedAt,
    ExecutedBy,
    SkipReason,
    Notes,
    IsCustom,
    IsOverridden,
    CreatedAt,
    UpdatedAt,
}
