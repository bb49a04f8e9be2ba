use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CrawlUnits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CrawlUnits::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CrawlUnits::BatchId).uuid().not_null())
                    .col(ColumnDef::new(CrawlUnits::Payload).json().not_null())
                    .col(ColumnDef::new(CrawlUnits::Status).string().not_null())
                    .col(
                        ColumnDef::new(CrawlUnits::AttemptCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CrawlUnits::MaxAttempts)
                            .integer()
                            .not_null()
                            .default(3),
                    )
                    .col(ColumnDef::new(CrawlUnits::ScheduledAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(CrawlUnits::LastError).text())
                    .col(
                        ColumnDef::new(CrawlUnits::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(CrawlUnits::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(CrawlUnits::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(CrawlUnits::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(CrawlUnits::LockToken).uuid())
                    .col(ColumnDef::new(CrawlUnits::LockExpiresAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Claim scans queued units by due time
        manager
            .create_index(
                Index::create()
                    .name("idx_crawl_units_status_scheduled_at")
                    .table(CrawlUnits::Table)
                    .col(CrawlUnits::Status)
                    .col(CrawlUnits::ScheduledAt)
                    .col(CrawlUnits::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_crawl_units_batch_id")
                    .table(CrawlUnits::Table)
                    .col(CrawlUnits::BatchId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CrawlUnits::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CrawlUnits {
    Table,
    Id,
    BatchId,
    Payload,
    Status,
    AttemptCount,
    MaxAttempts,
    ScheduledAt,
    LastError,
    CreatedAt,
    StartedAt,
    CompletedAt,
    UpdatedAt,
    LockToken,
    LockExpiresAt,
}
