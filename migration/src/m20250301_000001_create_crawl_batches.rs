use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CrawlBatches::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CrawlBatches::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CrawlBatches::RequestName).string())
                    .col(ColumnDef::new(CrawlBatches::FileName).string())
                    .col(ColumnDef::new(CrawlBatches::Region).string().not_null())
                    .col(ColumnDef::new(CrawlBatches::TotalUnits).integer().not_null())
                    .col(
                        ColumnDef::new(CrawlBatches::SuccessCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CrawlBatches::FailedCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CrawlBatches::SkippedCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(CrawlBatches::Status).string().not_null())
                    .col(
                        ColumnDef::new(CrawlBatches::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(CrawlBatches::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(CrawlBatches::CompletedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_crawl_batches_created_at")
                    .table(CrawlBatches::Table)
                    .col(CrawlBatches::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CrawlBatches::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CrawlBatches {
    Table,
    Id,
    RequestName,
    FileName,
    Region,
    TotalUnits,
    SuccessCount,
    FailedCount,
    SkippedCount,
    Status,
    CreatedAt,
    StartedAt,
    CompletedAt,
}
