// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_unit::{CrawlUnit, UnitStatus};
use crate::domain::repositories::crawl_unit_repository::{CrawlUnitRepository, RepositoryError};
use crate::infrastructure::database::entities::crawl_unit as unit_entity;
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use sea_orm::{
    sea_query::{Expr, LockBehavior, LockType},
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

/// 爬取单元仓库实现
///
/// 基于SeaORM实现的工作队列存储
#[derive(Clone)]
pub struct CrawlUnitRepositoryImpl {
    /// 数据库连接
    db: Arc<DatabaseConnection>,
}

impl CrawlUnitRepositoryImpl {
    /// 创建新的爬取单元仓库实例
    ///
    /// # 参数
    ///
    /// * `db` - 数据库连接
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<unit_entity::Model> for CrawlUnit {
    fn from(model: unit_entity::Model) -> Self {
        Self {
            id: model.id,
            batch_id: model.batch_id,
            payload: model.payload,
            status: model.status.parse().unwrap_or_default(),
            attempt_count: model.attempt_count,
            max_attempts: model.max_attempts,
            scheduled_at: model.scheduled_at,
            last_error: model.last_error,
            created_at: model.created_at,
            started_at: model.started_at,
            completed_at: model.completed_at,
            updated_at: model.updated_at,
            lock_token: model.lock_token,
            lock_expires_at: model.lock_expires_at,
        }
    }
}

impl From<&CrawlUnit> for unit_entity::ActiveModel {
    fn from(unit: &CrawlUnit) -> Self {
        Self {
            id: Set(unit.id),
            batch_id: Set(unit.batch_id),
            payload: Set(unit.payload.clone()),
            status: Set(unit.status.to_string()),
            attempt_count: Set(unit.attempt_count),
            max_attempts: Set(unit.max_attempts),
            scheduled_at: Set(unit.scheduled_at),
            last_error: Set(unit.last_error.clone()),
            created_at: Set(unit.created_at),
            started_at: Set(unit.started_at),
            completed_at: Set(unit.completed_at),
            updated_at: Set(unit.updated_at),
            lock_token: Set(unit.lock_token),
            lock_expires_at: Set(unit.lock_expires_at),
        }
    }
}

fn now() -> DateTime<FixedOffset> {
    Utc::now().into()
}

/// 单元仍处于活跃状态且租约属于 `lock_token`
fn held_by(id: Uuid, lock_token: Uuid) -> Condition {
    Condition::all()
        .add(unit_entity::Column::Id.eq(id))
        .add(unit_entity::Column::Status.eq(UnitStatus::Active.to_string()))
        .add(unit_entity::Column::LockToken.eq(lock_token))
}

#[async_trait]
impl CrawlUnitRepository for CrawlUnitRepositoryImpl {
    async fn create_many(&self, units: &[CrawlUnit]) -> Result<u64, RepositoryError> {
        if units.is_empty() {
            return Ok(0);
        }

        let models: Vec<unit_entity::ActiveModel> = units.iter().map(Into::into).collect();
        let inserted = unit_entity::Entity::insert_many(models)
            .exec_without_returning(self.db.as_ref())
            .await?;

        Ok(inserted)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CrawlUnit>, RepositoryError> {
        let model = unit_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?;

        Ok(model.map(Into::into))
    }

    async fn find_by_batch_id(&self, batch_id: Uuid) -> Result<Vec<CrawlUnit>, RepositoryError> {
        let models = unit_entity::Entity::find()
            .filter(unit_entity::Column::BatchId.eq(batch_id))
            .order_by_asc(unit_entity::Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;

        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn acquire_next(
        &self,
        worker_id: Uuid,
        lease: Duration,
    ) -> Result<Option<CrawlUnit>, RepositoryError> {
        let txn = self.db.begin().await?;
        let now = now();

        let unit = unit_entity::Entity::find()
            .filter(unit_entity::Column::Status.eq(UnitStatus::Queued.to_string()))
            .filter(
                Condition::any()
                    .add(unit_entity::Column::ScheduledAt.is_null())
                    .add(unit_entity::Column::ScheduledAt.lte(now)),
            )
            .order_by_asc(unit_entity::Column::CreatedAt)
            .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
            .one(&txn)
            .await?;

        let Some(unit) = unit else {
            txn.commit().await?;
            return Ok(None);
        };

        let mut active: unit_entity::ActiveModel = unit.into();
        let current_attempt = *active.attempt_count.as_ref();
        active.attempt_count = Set(current_attempt + 1);
        active.status = Set(UnitStatus::Active.to_string());
        active.lock_token = Set(Some(worker_id));
        active.lock_expires_at = Set(Some(now + lease));
        active.started_at = Set(Some(now));
        active.updated_at = Set(now);

        let updated = active.update(&txn).await?;
        txn.commit().await?;

        Ok(Some(updated.into()))
    }

    async fn renew_lease(
        &self,
        id: Uuid,
        lock_token: Uuid,
        lease: Duration,
    ) -> Result<bool, RepositoryError> {
        let now = now();
        let result = unit_entity::Entity::update_many()
            .col_expr(
                unit_entity::Column::LockExpiresAt,
                Expr::value(Some(now + lease)),
            )
            .col_expr(unit_entity::Column::UpdatedAt, Expr::value(now))
            .filter(held_by(id, lock_token))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn reschedule(
        &self,
        id: Uuid,
        lock_token: Uuid,
        scheduled_at: DateTime<FixedOffset>,
        error: &str,
    ) -> Result<bool, RepositoryError> {
        let result = unit_entity::Entity::update_many()
            .col_expr(
                unit_entity::Column::Status,
                Expr::value(UnitStatus::Queued.to_string()),
            )
            .col_expr(
                unit_entity::Column::ScheduledAt,
                Expr::value(Some(scheduled_at)),
            )
            .col_expr(
                unit_entity::Column::LastError,
                Expr::value(Some(error.to_string())),
            )
            .col_expr(
                unit_entity::Column::LockToken,
                Expr::value(Option::<Uuid>::None),
            )
            .col_expr(
                unit_entity::Column::LockExpiresAt,
                Expr::value(Option::<DateTime<FixedOffset>>::None),
            )
            .col_expr(unit_entity::Column::UpdatedAt, Expr::value(now()))
            .filter(held_by(id, lock_token))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn mark_finished(
        &self,
        id: Uuid,
        lock_token: Uuid,
        status: UnitStatus,
        error: Option<&str>,
    ) -> Result<bool, RepositoryError> {
        let now = now();
        let mut update = unit_entity::Entity::update_many()
            .col_expr(unit_entity::Column::Status, Expr::value(status.to_string()))
            .col_expr(unit_entity::Column::CompletedAt, Expr::value(Some(now)))
            .col_expr(
                unit_entity::Column::LockToken,
                Expr::value(Option::<Uuid>::None),
            )
            .col_expr(
                unit_entity::Column::LockExpiresAt,
                Expr::value(Option::<DateTime<FixedOffset>>::None),
            )
            .col_expr(unit_entity::Column::UpdatedAt, Expr::value(now));

        if let Some(error) = error {
            update = update.col_expr(
                unit_entity::Column::LastError,
                Expr::value(Some(error.to_string())),
            );
        }

        let result = update
            .filter(held_by(id, lock_token))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn reset_expired_leases(&self) -> Result<u64, RepositoryError> {
        let now = now();
        let result = unit_entity::Entity::update_many()
            .col_expr(
                unit_entity::Column::Status,
                Expr::value(UnitStatus::Queued.to_string()),
            )
            .col_expr(
                unit_entity::Column::LockToken,
                Expr::value(Option::<Uuid>::None),
            )
            .col_expr(
                unit_entity::Column::LockExpiresAt,
                Expr::value(Option::<DateTime<FixedOffset>>::None),
            )
            .col_expr(unit_entity::Column::UpdatedAt, Expr::value(now))
            .filter(unit_entity::Column::Status.eq(UnitStatus::Active.to_string()))
            .filter(unit_entity::Column::LockExpiresAt.lte(now))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected)
    }

    async fn cancel_queued_by_batch(&self, batch_id: Uuid) -> Result<u64, RepositoryError> {
        let now = now();
        let result = unit_entity::Entity::update_many()
            .col_expr(
                unit_entity::Column::Status,
                Expr::value(UnitStatus::Cancelled.to_string()),
            )
            .col_expr(unit_entity::Column::CompletedAt, Expr::value(Some(now)))
            .col_expr(unit_entity::Column::UpdatedAt, Expr::value(now))
            .filter(unit_entity::Column::BatchId.eq(batch_id))
            .filter(unit_entity::Column::Status.eq(UnitStatus::Queued.to_string()))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected)
    }

    async fn purge(&self) -> Result<u64, RepositoryError> {
        let result = unit_entity::Entity::delete_many()
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected)
    }
}
