use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CrawlLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CrawlLogs::CrawlId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CrawlLogs::BatchId).uuid().not_null())
                    .col(ColumnDef::new(CrawlLogs::Identifier).string().not_null())
                    .col(ColumnDef::new(CrawlLogs::Status).string().not_null())
                    .col(
                        ColumnDef::new(CrawlLogs::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(CrawlLogs::EndedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CrawlLogs::DurationSeconds).double().not_null())
                    .col(
                        ColumnDef::new(CrawlLogs::AttemptCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(CrawlLogs::DistributorCount).integer())
                    .col(ColumnDef::new(CrawlLogs::ErrorMessage).text())
                    .col(ColumnDef::new(CrawlLogs::ProductId).uuid())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_crawl_logs_batch_id")
                    .table(CrawlLogs::Table)
                    .col(CrawlLogs::BatchId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CrawlLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CrawlLogs {
    Table,
    CrawlId,
    BatchId,
    Identifier,
    Status,
    StartedAt,
    EndedAt,
    DurationSeconds,
    AttemptCount,
    DistributorCount,
    ErrorMessage,
    ProductId,
}
