// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_unit::{CrawlUnit, UnitStatus};
use crate::domain::repositories::crawl_unit_repository::{CrawlUnitRepository, RepositoryError};
use crate::utils::retry_policy::RetryPolicy;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// 队列错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    /// 仓库错误
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// 租约已过期并被回收，单元可能已由其他工作器领取
    #[error("Lease on unit {0} is no longer held")]
    LeaseLost(Uuid),
}

/// 成功确认时单元的去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckDisposition {
    /// 查询成功
    Completed,
    /// 数据源没有该料号
    Skipped,
}

impl From<AckDisposition> for UnitStatus {
    fn from(disposition: AckDisposition) -> Self {
        match disposition {
            AckDisposition::Completed => UnitStatus::Completed,
            AckDisposition::Skipped => UnitStatus::Skipped,
        }
    }
}

/// 一次可重试失败之后队列的决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// 已按退避重新排队，在该时间之后可再次领取
    Rescheduled(DateTime<Utc>),
    /// 尝试预算已用完，调用方需要永久失败该单元
    Exhausted,
}

/// 工作队列特质
///
/// 至少一次投递：单元在被确认前可能被再次领取，消费方需要幂等。
/// 确认、重试和永久失败只对当前租约持有者生效，否则返回 [`QueueError::LeaseLost`]。
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// 批量入队，返回被接受的单元数
    async fn enqueue_bulk(&self, units: Vec<CrawlUnit>) -> Result<usize, QueueError>;

    /// 领取下一个到期的单元，领取会使尝试次数加一
    async fn claim(&self, worker_id: Uuid) -> Result<Option<CrawlUnit>, QueueError>;

    /// 续租，租约已不属于调用方时返回 [`QueueError::LeaseLost`]
    async fn renew_lease(&self, unit: &CrawlUnit) -> Result<(), QueueError>;

    /// 确认单元处理完毕
    async fn ack(&self, unit: &CrawlUnit, disposition: AckDisposition) -> Result<(), QueueError>;

    /// 可重试失败：仍有预算时按退避重新排队
    async fn fail_and_retry(
        &self,
        unit: &CrawlUnit,
        error: &str,
    ) -> Result<RetryDecision, QueueError>;

    /// 永久失败，单元不再被投递
    async fn fail_permanently(&self, unit: &CrawlUnit, error: &str) -> Result<(), QueueError>;

    /// 取消批次下仍在排队的单元
    async fn cancel_batch(&self, batch_id: Uuid) -> Result<u64, QueueError>;

    /// 按ID查看单元
    async fn find_unit(&self, id: Uuid) -> Result<Option<CrawlUnit>, QueueError>;

    /// 批次下的全部单元，按入队顺序
    async fn units_for_batch(&self, batch_id: Uuid) -> Result<Vec<CrawlUnit>, QueueError>;

    /// 把租约已过期的单元放回队列
    async fn release_expired_leases(&self) -> Result<u64, QueueError>;

    /// 清空队列
    async fn purge(&self) -> Result<u64, QueueError>;
}

/// 基于数据库表的工作队列实现
pub struct PostgresWorkQueue<R: CrawlUnitRepository> {
    /// 单元仓库
    repository: Arc<R>,
    /// 重试退避策略
    retry_policy: RetryPolicy,
    /// 租约时长
    lease: chrono::Duration,
    /// 每次插入的单元数
    chunk_size: usize,
}

impl<R: CrawlUnitRepository> PostgresWorkQueue<R> {
    /// 创建工作队列
    ///
    /// # 参数
    ///
    /// * `repository` - 单元仓库
    /// * `retry_policy` - 重试退避策略
    /// * `lease` - 领取后的租约时长
    /// * `chunk_size` - 批量入队时每块的单元数
    pub fn new(
        repository: Arc<R>,
        retry_policy: RetryPolicy,
        lease: chrono::Duration,
        chunk_size: usize,
    ) -> Self {
        Self {
            repository,
            retry_policy,
            lease,
            chunk_size: chunk_size.max(1),
        }
    }
}

/// 领取时写入的租约令牌
fn lease_token(unit: &CrawlUnit) -> Result<Uuid, QueueError> {
    unit.lock_token.ok_or(QueueError::LeaseLost(unit.id))
}

#[async_trait]
impl<R: CrawlUnitRepository> WorkQueue for PostgresWorkQueue<R> {
    async fn enqueue_bulk(&self, units: Vec<CrawlUnit>) -> Result<usize, QueueError> {
        let mut accepted = 0usize;
        for chunk in units.chunks(self.chunk_size) {
            let inserted = self.repository.create_many(chunk).await?;
            accepted += inserted as usize;
            if (inserted as usize) < chunk.len() {
                // Caller compares accepted against requested
                break;
            }
        }
        debug!(accepted, requested = units.len(), "Enqueued crawl units");
        Ok(accepted)
    }

    async fn claim(&self, worker_id: Uuid) -> Result<Option<CrawlUnit>, QueueError> {
        let unit = self.repository.acquire_next(worker_id, self.lease).await?;
        Ok(unit)
    }

    async fn renew_lease(&self, unit: &CrawlUnit) -> Result<(), QueueError> {
        let token = lease_token(unit)?;
        if !self.repository.renew_lease(unit.id, token, self.lease).await? {
            return Err(QueueError::LeaseLost(unit.id));
        }
        Ok(())
    }

    async fn ack(&self, unit: &CrawlUnit, disposition: AckDisposition) -> Result<(), QueueError> {
        let token = lease_token(unit)?;
        if !self
            .repository
            .mark_finished(unit.id, token, disposition.into(), None)
            .await?
        {
            return Err(QueueError::LeaseLost(unit.id));
        }
        Ok(())
    }

    async fn fail_and_retry(
        &self,
        unit: &CrawlUnit,
        error: &str,
    ) -> Result<RetryDecision, QueueError> {
        let token = lease_token(unit)?;
        let attempt = unit.attempt_count.max(0) as u32;
        if !unit.has_attempts_remaining() {
            return Ok(RetryDecision::Exhausted);
        }

        let next = self.retry_policy.next_retry_time(attempt, Utc::now());
        if !self
            .repository
            .reschedule(unit.id, token, next.into(), error)
            .await?
        {
            return Err(QueueError::LeaseLost(unit.id));
        }
        Ok(RetryDecision::Rescheduled(next))
    }

    async fn fail_permanently(&self, unit: &CrawlUnit, error: &str) -> Result<(), QueueError> {
        let token = lease_token(unit)?;
        if !self
            .repository
            .mark_finished(unit.id, token, UnitStatus::Failed, Some(error))
            .await?
        {
            return Err(QueueError::LeaseLost(unit.id));
        }
        Ok(())
    }

    async fn cancel_batch(&self, batch_id: Uuid) -> Result<u64, QueueError> {
        let cancelled = self.repository.cancel_queued_by_batch(batch_id).await?;
        Ok(cancelled)
    }

    async fn find_unit(&self, id: Uuid) -> Result<Option<CrawlUnit>, QueueError> {
        Ok(self.repository.find_by_id(id).await?)
    }

    async fn units_for_batch(&self, batch_id: Uuid) -> Result<Vec<CrawlUnit>, QueueError> {
        Ok(self.repository.find_by_batch_id(batch_id).await?)
    }

    async fn release_expired_leases(&self) -> Result<u64, QueueError> {
        let released = self.repository.reset_expired_leases().await?;
        Ok(released)
    }

    async fn purge(&self) -> Result<u64, QueueError> {
        let removed = self.repository.purge().await?;
        Ok(removed)
    }
}

#[async_trait]
impl<T: WorkQueue + ?Sized> WorkQueue for Arc<T> {
    async fn enqueue_bulk(&self, units: Vec<CrawlUnit>) -> Result<usize, QueueError> {
        (**self).enqueue_bulk(units).await
    }

    async fn claim(&self, worker_id: Uuid) -> Result<Option<CrawlUnit>, QueueError> {
        (**self).claim(worker_id).await
    }

    async fn renew_lease(&self, unit: &CrawlUnit) -> Result<(), QueueError> {
        (**self).renew_lease(unit).await
    }

    async fn ack(&self, unit: &CrawlUnit, disposition: AckDisposition) -> Result<(), QueueError> {
        (**self).ack(unit, disposition).await
    }

    async fn fail_and_retry(
        &self,
        unit: &CrawlUnit,
        error: &str,
    ) -> Result<RetryDecision, QueueError> {
        (**self).fail_and_retry(unit, error).await
    }

    async fn fail_permanently(&self, unit: &CrawlUnit, error: &str) -> Result<(), QueueError> {
        (**self).fail_permanently(unit, error).await
    }

    async fn cancel_batch(&self, batch_id: Uuid) -> Result<u64, QueueError> {
        (**self).cancel_batch(batch_id).await
    }

    async fn find_unit(&self, id: Uuid) -> Result<Option<CrawlUnit>, QueueError> {
        (**self).find_unit(id).await
    }

    async fn units_for_batch(&self, batch_id: Uuid) -> Result<Vec<CrawlUnit>, QueueError> {
        (**self).units_for_batch(batch_id).await
    }

    async fn release_expired_leases(&self) -> Result<u64, QueueError> {
        (**self).release_expired_leases().await
    }

    async fn purge(&self) -> Result<u64, QueueError> {
        (**self).purge().await
    }
}
