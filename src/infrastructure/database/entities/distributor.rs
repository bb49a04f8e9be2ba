// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "distributors")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub sku: String,
    pub stock: i64,
    pub min_quantity: i64,
    pub packaging: String,
    pub currency: String,
    #[sea_orm(column_name = "price1")]
    pub price_1: Option<f64>,
    #[sea_orm(column_name = "price10")]
    pub price_10: Option<f64>,
    #[sea_orm(column_name = "price100")]
    pub price_100: Option<f64>,
    #[sea_orm(column_name = "price1000")]
    pub price_1000: Option<f64>,
    #[sea_orm(column_name = "price10000")]
    pub price_10000: Option<f64>,
    pub source_updated: String,
    pub created_at: ChronoDateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
