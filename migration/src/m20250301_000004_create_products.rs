use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Products::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Products::CrawlId).uuid().not_null())
                    .col(ColumnDef::new(Products::BatchId).uuid().not_null())
                    .col(ColumnDef::new(Products::Mpn).string().not_null())
                    .col(ColumnDef::new(Products::Url).text().not_null())
                    .col(ColumnDef::new(Products::Title).text())
                    .col(ColumnDef::new(Products::Brand).string())
                    .col(ColumnDef::new(Products::MedianPrice).string())
                    .col(
                        ColumnDef::new(Products::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // One product row per crawl attempt; replays are ignored
        manager
            .create_index(
                Index::create()
                    .name("idx_products_crawl_id")
                    .table(Products::Table)
                    .col(Products::CrawlId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_products_batch_id")
                    .table(Products::Table)
                    .col(Products::BatchId)
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
enum Products {
    Table,
    Id,
    CrawlId,
    BatchId,
    Mpn,
    Url,
    Title,
    Brand,
    MedianPrice,
    CreatedAt,
}
