// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_unit::{CrawlUnit, UnitStatus};
use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset};
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
}

/// 爬取单元仓库特质
///
/// 工作队列的持久化接口
#[async_trait]
pub trait CrawlUnitRepository: Send + Sync {
    /// 批量插入单元，返回插入行数
    async fn create_many(&self, units: &[CrawlUnit]) -> Result<u64, RepositoryError>;
    /// 根据ID查找单元
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CrawlUnit>, RepositoryError>;
    /// 查找批次下的全部单元
    async fn find_by_batch_id(&self, batch_id: Uuid) -> Result<Vec<CrawlUnit>, RepositoryError>;
    /// 领取下一个到期的单元并设置租约
    async fn acquire_next(
        &self,
        worker_id: Uuid,
        lease: Duration,
    ) -> Result<Option<CrawlUnit>, RepositoryError>;
    /// 持有者续租，返回租约是否仍属于 `lock_token`
    async fn renew_lease(
        &self,
        id: Uuid,
        lock_token: Uuid,
        lease: Duration,
    ) -> Result<bool, RepositoryError>;
    /// 释放租约并在指定时间后重新投递
    ///
    /// 仅当单元仍处于活跃状态且由 `lock_token` 持有时生效，返回是否生效。
    async fn reschedule(
        &self,
        id: Uuid,
        lock_token: Uuid,
        scheduled_at: DateTime<FixedOffset>,
        error: &str,
    ) -> Result<bool, RepositoryError>;
    /// 将单元置为终态，持有条件同 [`CrawlUnitRepository::reschedule`]
    async fn mark_finished(
        &self,
        id: Uuid,
        lock_token: Uuid,
        status: UnitStatus,
        error: Option<&str>,
    ) -> Result<bool, RepositoryError>;
    /// 将租约已过期的活跃单元放回队列
    async fn reset_expired_leases(&self) -> Result<u64, RepositoryError>;
    /// 取消批次下仍在排队的单元
    async fn cancel_queued_by_batch(&self, batch_id: Uuid) -> Result<u64, RepositoryError>;
    /// 删除全部单元
    async fn purge(&self) -> Result<u64, RepositoryError>;
}
