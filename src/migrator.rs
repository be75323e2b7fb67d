use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_products_table::Migration),
            Box::new(m20240301_000002_create_stock_movements_table::Migration),
            Box::new(m20240301_000003_create_clients_table::Migration),
            Box::new(m20240301_000004_create_procedure_tables::Migration),
            Box::new(m20240301_000005_create_appointments_table::Migration),
            Box::new(m20240315_000006_create_campaigns_table::Migration),
        ]
    }
}

mod m20240301_000001_create_products_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Products::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Products::UserId).uuid().not_null())
                        .col(ColumnDef::new(Products::Name).string().not_null())
                        .col(ColumnDef::new(Products::Description).text().null())
                        .col(ColumnDef::new(Products::Sku).string().null())
                        .col(ColumnDef::new(Products::Category).string().null())
                        .col(
                            ColumnDef::new(Products::Unit)
                                .string_len(20)
                                .not_null()
                                .default("un"),
                        )
                        .col(
                            ColumnDef::new(Products::CostPrice)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::CurrentStock)
                                .decimal_len(12, 3)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::MinStock)
                                .decimal_len(12, 3)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::ExpiryDate).date().null())
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_user_id")
                        .table(Products::Table)
                        .col(Products::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_category")
                        .table(Products::Table)
                        .col(Products::UserId)
                        .col(Products::Category)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        UserId,
        Name,
        Description,
        Sku,
        Category,
        Unit,
        CostPrice,
        CurrentStock,
        MinStock,
        ExpiryDate,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_stock_movements_table {
    use super::m20240301_000001_create_products_table::Products;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_stock_movements_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockMovements::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockMovements::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::UserId).uuid().not_null())
                        .col(ColumnDef::new(StockMovements::ProductId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockMovements::MovementType)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::Quantity)
                                .decimal_len(12, 3)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::UnitCost)
                                .decimal_len(12, 2)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::PreviousStock)
                                .decimal_len(12, 3)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockMovements::NewStock)
                                .decimal_len(12, 3)
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockMovements::ReferenceType).string().null())
                        .col(ColumnDef::new(StockMovements::ReferenceId).string().null())
                        .col(ColumnDef::new(StockMovements::Notes).text().null())
                        .col(
                            ColumnDef::new(StockMovements::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_movements_product_id")
                                .from(StockMovements::Table, StockMovements::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            for (name, col) in [
                ("idx_stock_movements_user_id", StockMovements::UserId),
                ("idx_stock_movements_product_id", StockMovements::ProductId),
                ("idx_stock_movements_created_at", StockMovements::CreatedAt),
            ] {
                manager
                    .create_index(
                        Index::create()
                            .if_not_exists()
                            .name(name)
                            .table(StockMovements::Table)
                            .col(col)
                            .to_owned(),
                    )
                    .await?;
            }

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockMovements::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum StockMovements {
        Table,
        Id,
        UserId,
        ProductId,
        MovementType,
        Quantity,
        UnitCost,
        PreviousStock,
        NewStock,
        ReferenceType,
        ReferenceId,
        Notes,
        CreatedAt,
    }
}

mod m20240301_000003_create_clients_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_clients_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Clients::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Clients::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Clients::UserId).uuid().not_null())
                        .col(ColumnDef::new(Clients::Name).string().not_null())
                        .col(ColumnDef::new(Clients::Email).string().null())
                        .col(ColumnDef::new(Clients::Phone).string_len(20).null())
                        .col(ColumnDef::new(Clients::Cpf).string_len(14).null())
                        .col(ColumnDef::new(Clients::Birthday).date().null())
                        .col(ColumnDef::new(Clients::Address).json().null())
                        .col(ColumnDef::new(Clients::Preferences).text().null())
                        .col(ColumnDef::new(Clients::Observations).text().null())
                        .col(
                            ColumnDef::new(Clients::Status)
                                .string_len(20)
                                .not_null()
                                .default("active"),
                        )
                        .col(ColumnDef::new(Clients::Segment).string_len(20).null())
                        .col(
                            ColumnDef::new(Clients::FirstVisit)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Clients::LastVisit)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Clients::TotalSpent)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Clients::TotalVisits)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Clients::LtvScore).decimal_len(12, 2).null())
                        .col(
                            ColumnDef::new(Clients::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Clients::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_clients_user_id")
                        .table(Clients::Table)
                        .col(Clients::UserId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Clients::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Clients {
        Table,
        Id,
        UserId,
        Name,
        Email,
        Phone,
        Cpf,
        Birthday,
        Address,
        Preferences,
        Observations,
        Status,
        Segment,
        FirstVisit,
        LastVisit,
        TotalSpent,
        TotalVisits,
        LtvScore,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000004_create_procedure_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_procedure_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProcedureCategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProcedureCategories::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProcedureCategories::UserId).uuid().not_null())
                        .col(ColumnDef::new(ProcedureCategories::Name).string().not_null())
                        .col(ColumnDef::new(ProcedureCategories::Description).text().null())
                        .col(ColumnDef::new(ProcedureCategories::Color).string_len(16).null())
                        .col(
                            ColumnDef::new(ProcedureCategories::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(ProcedureCategories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Procedures::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Procedures::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Procedures::UserId).uuid().not_null())
                        .col(ColumnDef::new(Procedures::CategoryId).uuid().null())
                        .col(ColumnDef::new(Procedures::Name).string().not_null())
                        .col(ColumnDef::new(Procedures::Description).text().null())
                        .col(
                            ColumnDef::new(Procedures::Price)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Procedures::Cost)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Procedures::DurationMinutes)
                                .integer()
                                .not_null()
                                .default(60),
                        )
                        .col(
                            ColumnDef::new(Procedures::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Procedures::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Procedures::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_procedures_category_id")
                                .from(Procedures::Table, Procedures::CategoryId)
                                .to(ProcedureCategories::Table, ProcedureCategories::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_procedures_user_id")
                        .table(Procedures::Table)
                        .col(Procedures::UserId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Procedures::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProcedureCategories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ProcedureCategories {
        Table,
        Id,
        UserId,
        Name,
        Description,
        Color,
        IsActive,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    pub(super) enum Procedures {
        Table,
        Id,
        UserId,
        CategoryId,
        Name,
        Description,
        Price,
        Cost,
        DurationMinutes,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000005_create_appointments_table {
    use super::m20240301_000003_create_clients_table::Clients;
    use super::m20240301_000004_create_procedure_tables::Procedures;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_appointments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Appointments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Appointments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Appointments::UserId).uuid().not_null())
                        .col(ColumnDef::new(Appointments::ClientId).uuid().not_null())
                        .col(ColumnDef::new(Appointments::ProcedureId).uuid().not_null())
                        .col(
                            ColumnDef::new(Appointments::ScheduledAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Appointments::DurationMinutes).integer().null())
                        .col(
                            ColumnDef::new(Appointments::Status)
                                .string_len(20)
                                .not_null()
                                .default("scheduled"),
                        )
                        .col(ColumnDef::new(Appointments::Notes).text().null())
                        .col(ColumnDef::new(Appointments::GoogleEventId).string().null())
                        .col(ColumnDef::new(Appointments::GoogleMeetLink).string().null())
                        .col(
                            ColumnDef::new(Appointments::CalendarSynced)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Appointments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Appointments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_appointments_client_id")
                                .from(Appointments::Table, Appointments::ClientId)
                                .to(Clients::Table, Clients::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_appointments_procedure_id")
                                .from(Appointments::Table, Appointments::ProcedureId)
                                .to(Procedures::Table, Procedures::Id)
                                .on_delete(ForeignKeyAction::Restrict),
                        )
                        .to_owned(),
                )
                .await?;

            for (name, col) in [
                ("idx_appointments_user_id", Appointments::UserId),
                ("idx_appointments_client_id", Appointments::ClientId),
                ("idx_appointments_scheduled_at", Appointments::ScheduledAt),
            ] {
                manager
                    .create_index(
                        Index::create()
                            .if_not_exists()
                            .name(name)
                            .table(Appointments::Table)
                            .col(col)
                            .to_owned(),
                    )
                    .await?;
            }

            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Appointments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Appointments {
        Table,
        Id,
        UserId,
        ClientId,
        ProcedureId,
        ScheduledAt,
        DurationMinutes,
        Status,
        Notes,
        GoogleEventId,
        GoogleMeetLink,
        CalendarSynced,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240315_000006_create_campaigns_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240315_000006_create_campaigns_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            let counter = |col: Campaigns| {
                ColumnDef::new(col).integer().not_null().default(0).to_owned()
            };

            manager
                .create_table(
                    Table::create()
                        .table(Campaigns::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Campaigns::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Campaigns::UserId).uuid().not_null())
                        .col(ColumnDef::new(Campaigns::Name).string().not_null())
                        .col(ColumnDef::new(Campaigns::Description).text().null())
                        .col(ColumnDef::new(Campaigns::CampaignType).string_len(20).not_null())
                        .col(
                            ColumnDef::new(Campaigns::Status)
                                .string_len(20)
                                .not_null()
                                .default("draft"),
                        )
                        .col(
                            ColumnDef::new(Campaigns::TriggerType)
                                .string_len(20)
                                .not_null()
                                .default("manual"),
                        )
                        .col(ColumnDef::new(Campaigns::TargetType).string_len(20).not_null())
                        .col(ColumnDef::new(Campaigns::TargetSegment).string_len(20).null())
                        .col(ColumnDef::new(Campaigns::TargetCriteria).json().null())
                        .col(ColumnDef::new(Campaigns::Content).json().null())
                        .col(
                            ColumnDef::new(Campaigns::ScheduledAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Campaigns::StartedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Campaigns::CompletedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(counter(Campaigns::TargetCount))
                        .col(counter(Campaigns::SentCount))
                        .col(counter(Campaigns::DeliveredCount))
                        .col(counter(Campaigns::OpenedCount))
                        .col(counter(Campaigns::ClickedCount))
                        .col(counter(Campaigns::ConvertedCount))
                        .col(
                            ColumnDef::new(Campaigns::RevenueGenerated)
                                .decimal_len(16, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Campaigns::Cost)
                                .decimal_len(16, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Campaigns::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Campaigns::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Campaigns::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_campaigns_user_id")
                        .table(Campaigns::Table)
                        .col(Campaigns::UserId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Campaigns::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden, Clone, Copy)]
    enum Campaigns {
        Table,
        Id,
        UserId,
        Name,
        Description,
        CampaignType,
        Status,
        TriggerType,
        TargetType,
        TargetSegment,
        TargetCriteria,
        Content,
        ScheduledAt,
        StartedAt,
        CompletedAt,
        TargetCount,
        SentCount,
        DeliveredCount,
        OpenedCount,
        ClickedCount,
        ConvertedCount,
        RevenueGenerated,
        Cost,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}
