// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "crawl_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub crawl_id: Uuid,
    pub batch_id: Uuid,
    pub identifier: String,
    pub status: String,
    pub started_at: ChronoDateTimeWithTimeZone,
    pub ended_at: ChronoDateTimeWithTimeZone,
    pub duration_seconds: f64,
    pub attempt_count: i32,
    pub distributor_count: Option<i32>,
    pub error_message: Option<String>,
    pub product_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
