// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::batch::{Batch, BatchStatus, CounterKind, CounterUpdate, FailurePolicy};
use crate::domain::repositories::batch_repository::BatchRepository;
use crate::domain::repositories::crawl_unit_repository::RepositoryError;
use crate::infrastructure::database::entities::crawl_batch as batch_entity;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::{
    sea_query::{Expr, SimpleExpr},
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// 批次仓库实现
///
/// 计数器自增与终态转换都是带条件的单条 UPDATE，
/// 多个工作器并发更新同一批次时无需读-改-写。
#[derive(Clone)]
pub struct BatchRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
    /// 含失败单元时的终结策略
    failure_policy: FailurePolicy,
}

impl BatchRepositoryImpl {
    /// 创建新的批次仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    /// * `failure_policy` - 终结策略
    pub fn new(db: Arc<DatabaseConnection>, failure_policy: FailurePolicy) -> Self {
        Self { db, failure_policy }
    }

    fn counter_column(kind: CounterKind) -> batch_entity::Column {
        match kind {
            CounterKind::Success => batch_entity::Column::SuccessCount,
            CounterKind::Failed => batch_entity::Column::FailedCount,
            CounterKind::Skipped => batch_entity::Column::SkippedCount,
        }
    }

    fn processed_sum() -> SimpleExpr {
        Expr::col(batch_entity::Column::SuccessCount)
            .add(Expr::col(batch_entity::Column::FailedCount))
            .add(Expr::col(batch_entity::Column::SkippedCount))
    }

    fn open_statuses() -> Vec<String> {
        vec![
            BatchStatus::Pending.to_string(),
            BatchStatus::InProgress.to_string(),
        ]
    }

    /// 以 `extra` 为附加条件尝试把已满的批次转为 `status`
    async fn try_finalize(
        &self,
        id: Uuid,
        status: BatchStatus,
        extra: Option<SimpleExpr>,
    ) -> Result<bool, RepositoryError> {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let mut update = batch_entity::Entity::update_many()
            .col_expr(batch_entity::Column::Status, Expr::value(status.to_string()))
            .col_expr(batch_entity::Column::CompletedAt, Expr::value(Some(now)))
            .filter(batch_entity::Column::Id.eq(id))
            .filter(batch_entity::Column::Status.is_in(Self::open_statuses()))
            .filter(Expr::expr(Self::processed_sum()).gte(Expr::col(batch_entity::Column::TotalUnits)));

        if let Some(extra) = extra {
            update = update.filter(extra);
        }

        let result = update.exec(self.db.as_ref()).await?;
        Ok(result.rows_affected == 1)
    }

    /// 计数已满时执行终态转换，返回本次调用完成的终态
    async fn finalize_if_complete(&self, id: Uuid) -> Result<Option<BatchStatus>, RepositoryError> {
        match self.failure_policy {
            FailurePolicy::Complete => {
                if self.try_finalize(id, BatchStatus::Completed, None).await? {
                    return Ok(Some(BatchStatus::Completed));
                }
            }
            FailurePolicy::Fail => {
                // Counters no longer move once full, so the two guards cannot both match
                let has_failures = Expr::col(batch_entity::Column::FailedCount).gt(0);
                if self
                    .try_finalize(id, BatchStatus::Failed, Some(has_failures))
                    .await?
                {
                    return Ok(Some(BatchStatus::Failed));
                }
                let no_failures = Expr::col(batch_entity::Column::FailedCount).eq(0);
                if self
                    .try_finalize(id, BatchStatus::Completed, Some(no_failures))
                    .await?
                {
                    return Ok(Some(BatchStatus::Completed));
                }
            }
        }
        Ok(None)
    }
}

impl From<batch_entity::Model> for Batch {
    fn from(model: batch_entity::Model) -> Self {
        Self {
            id: model.id,
            request_name: model.request_name,
            file_name: model.file_name,
            region: model.region,
            total_units: model.total_units,
            success_count: model.success_count,
            failed_count: model.failed_count,
            skipped_count: model.skipped_count,
            status: model.status.parse().unwrap_or_default(),
            created_at: model.created_at.with_timezone(&Utc),
            started_at: model.started_at.map(|t| t.with_timezone(&Utc)),
            completed_at: model.completed_at.map(|t| t.with_timezone(&Utc)),
        }
    }
}

impl From<&Batch> for batch_entity::ActiveModel {
    fn from(batch: &Batch) -> Self {
        Self {
            id: Set(batch.id),
            request_name: Set(batch.request_name.clone()),
            file_name: Set(batch.file_name.clone()),
            region: Set(batch.region.clone()),
            total_units: Set(batch.total_units),
            success_count: Set(batch.success_count),
            failed_count: Set(batch.failed_count),
            skipped_count: Set(batch.skipped_count),
            status: Set(batch.status.to_string()),
            created_at: Set(batch.created_at.into()),
            started_at: Set(batch.started_at.map(Into::into)),
            completed_at: Set(batch.completed_at.map(Into::into)),
        }
    }
}

#[async_trait]
impl BatchRepository for BatchRepositoryImpl {
    async fn create(&self, batch: &Batch) -> Result<Batch, RepositoryError> {
        let model: batch_entity::ActiveModel = batch.into();
        let inserted = model.insert(self.db.as_ref()).await?;
        Ok(inserted.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Batch>, RepositoryError> {
        let model = batch_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn list_recent(&self, limit: u64) -> Result<Vec<Batch>, RepositoryError> {
        let models = batch_entity::Entity::find()
            .order_by_desc(batch_entity::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn mark_in_progress(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let result = batch_entity::Entity::update_many()
            .col_expr(
                batch_entity::Column::Status,
                Expr::value(BatchStatus::InProgress.to_string()),
            )
            .col_expr(batch_entity::Column::StartedAt, Expr::value(Some(now)))
            .filter(batch_entity::Column::Id.eq(id))
            .filter(batch_entity::Column::Status.eq(BatchStatus::Pending.to_string()))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn increment_counter(
        &self,
        id: Uuid,
        kind: CounterKind,
    ) -> Result<CounterUpdate, RepositoryError> {
        let column = Self::counter_column(kind);
        let result = batch_entity::Entity::update_many()
            .col_expr(column, Expr::col(column).add(1))
            .filter(batch_entity::Column::Id.eq(id))
            .filter(Expr::expr(Self::processed_sum()).lt(Expr::col(batch_entity::Column::TotalUnits)))
            .exec(self.db.as_ref())
            .await?;

        let applied = result.rows_affected == 1;
        let finalized = self.finalize_if_complete(id).await?;

        if let Some(status) = finalized {
            info!(batch_id = %id, status = %status, "Batch finalized");
        }

        Ok(CounterUpdate { applied, finalized })
    }

    async fn mark_failed(&self, id: Uuid, reason: &str) -> Result<bool, RepositoryError> {
        let now: DateTime<FixedOffset> = Utc::now().into();
        let result = batch_entity::Entity::update_many()
            .col_expr(
                batch_entity::Column::Status,
                Expr::value(BatchStatus::Failed.to_string()),
            )
            .col_expr(batch_entity::Column::CompletedAt, Expr::value(Some(now)))
            .filter(batch_entity::Column::Id.eq(id))
            .filter(batch_entity::Column::Status.is_in(Self::open_statuses()))
            .exec(self.db.as_ref())
            .await?;

        let transitioned = result.rows_affected == 1;
        if transitioned {
            warn!(batch_id = %id, reason, "Batch marked failed");
        }
        Ok(transitioned)
    }
}
