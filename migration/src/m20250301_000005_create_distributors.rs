use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Distributors::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Distributors::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Distributors::ProductId).uuid().not_null())
                    .col(ColumnDef::new(Distributors::Name).string().not_null())
                    .col(ColumnDef::new(Distributors::Sku).string().not_null())
                    .col(
                        ColumnDef::new(Distributors::Stock)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Distributors::MinQuantity)
                            .big_integer()
                            .not_null()
                            .default(1),
                    )
                    .col(ColumnDef::new(Distributors::Packaging).string().not_null())
                    .col(ColumnDef::new(Distributors::Currency).string().not_null())
                    .col(ColumnDef::new(Distributors::Price1).double())
                    .col(ColumnDef::new(Distributors::Price10).double())
                    .col(ColumnDef::new(Distributors::Price100).double())
                    .col(ColumnDef::new(Distributors::Price1000).double())
                    .col(ColumnDef::new(Distributors::Price10000).double())
                    .col(ColumnDef::new(Distributors::SourceUpdated).string().not_null())
                    .col(
                        ColumnDef::new(Distributors::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_distributors_product_name_sku")
                    .table(Distributors::Table)
                    .col(Distributors::ProductId)
                    .col(Distributors::Name)
                    .col(Distributors::Sku)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Distributors::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Distributors {
    Table,
    Id,
    ProductId,
    Name,
    Sku,
    Stock,
    MinQuantity,
    Packaging,
    Currency,
    Price1,
    Price10,
    Price100,
    Price1000,
    Price10000,
    SourceUpdated,
    CreatedAt,
}
