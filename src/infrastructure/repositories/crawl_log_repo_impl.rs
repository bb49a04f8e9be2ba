// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_log::{CrawlLog, CrawlLogStatus};
use crate::domain::repositories::crawl_log_repository::CrawlLogRepository;
use crate::domain::repositories::crawl_unit_repository::RepositoryError;
use crate::infrastructure::database::entities::crawl_log as log_entity;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 爬取日志仓库实现
#[derive(Clone)]
pub struct CrawlLogRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl CrawlLogRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<log_entity::Model> for CrawlLog {
    fn from(model: log_entity::Model) -> Self {
        Self {
            crawl_id: model.crawl_id,
            batch_id: model.batch_id,
            identifier: model.identifier,
            status: model.status.parse().unwrap_or(CrawlLogStatus::Failed),
            started_at: model.started_at.with_timezone(&Utc),
            ended_at: model.ended_at.with_timezone(&Utc),
            duration_seconds: model.duration_seconds,
            attempt_count: model.attempt_count,
            distributor_count: model.distributor_count,
            error_message: model.error_message,
            product_id: model.product_id,
        }
    }
}

#[async_trait]
impl CrawlLogRepository for CrawlLogRepositoryImpl {
    async fn create(&self, log: &CrawlLog) -> Result<(), RepositoryError> {
        let model = log_entity::ActiveModel {
            crawl_id: Set(log.crawl_id),
            batch_id: Set(log.batch_id),
            identifier: Set(log.identifier.clone()),
            status: Set(log.status.to_string()),
            started_at: Set(log.started_at.into()),
            ended_at: Set(log.ended_at.into()),
            duration_seconds: Set(log.duration_seconds),
            attempt_count: Set(log.attempt_count),
            distributor_count: Set(log.distributor_count),
            error_message: Set(log.error_message.clone()),
            product_id: Set(log.product_id),
        };

        model.insert(self.db.as_ref()).await?;
        Ok(())
    }

    async fn link_product(
        &self,
        crawl_id: Uuid,
        product_id: Uuid,
    ) -> Result<bool, RepositoryError> {
        let result = log_entity::Entity::update_many()
            .col_expr(log_entity::Column::ProductId, Expr::value(Some(product_id)))
            .filter(log_entity::Column::CrawlId.eq(crawl_id))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn find_by_batch_id(&self, batch_id: Uuid) -> Result<Vec<CrawlLog>, RepositoryError> {
        let models = log_entity::Entity::find()
            .filter(log_entity::Column::BatchId.eq(batch_id))
            .order_by_asc(log_entity::Column::StartedAt)
            .all(self.db.as_ref())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }
}
