// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::crawl_unit_repository::RepositoryError;
use crate::domain::models::batch::{Batch, CounterKind, CounterUpdate};
use async_trait::async_trait;
use uuid::Uuid;

/// 批次状态仓库特质
///
/// 批次记录只通过条件更新和原子自增修改，调用方从不先读后写。
#[async_trait]
pub trait BatchRepository: Send + Sync {
    /// 创建批次记录
    ///
    /// # 参数
    ///
    /// * `batch` - 要创建的批次
    ///
    /// # 返回值
    ///
    /// * `Ok(Batch)` - 创建成功的批次
    /// * `Err(RepositoryError)` - 创建失败
    async fn create(&self, batch: &Batch) -> Result<Batch, RepositoryError>;

    /// 根据ID查找批次
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Batch>, RepositoryError>;

    /// 按创建时间倒序列出最近的批次
    async fn list_recent(&self, limit: u64) -> Result<Vec<Batch>, RepositoryError>;

    /// Pending → InProgress
    ///
    /// 幂等的"仅当 pending 时设置"。并发的首个调用者中只有一个会真正完成转换。
    ///
    /// # 返回值
    ///
    /// * `Ok(true)` - 本次调用完成了转换
    /// * `Ok(false)` - 批次已在进行中或已终结
    async fn mark_in_progress(&self, id: Uuid) -> Result<bool, RepositoryError>;

    /// 原子地为指定计数器加一，并在计数总和达到单元总数时尝试终结批次
    ///
    /// 自增不读取当前值；当总和已等于总数时自增不生效。
    /// 终结是带状态条件的单条更新，只有一个调用者能完成终态转换。
    ///
    /// # 参数
    ///
    /// * `id` - 批次ID
    /// * `kind` - 计数器种类
    ///
    /// # 返回值
    ///
    /// * `Ok(CounterUpdate)` - 自增及终结结果
    /// * `Err(RepositoryError)` - 更新失败
    async fn increment_counter(
        &self,
        id: Uuid,
        kind: CounterKind,
    ) -> Result<CounterUpdate, RepositoryError>;

    /// 将尚未终结的批次置为 Failed
    ///
    /// # 参数
    ///
    /// * `id` - 批次ID
    /// * `reason` - 失败原因，记录到日志
    ///
    /// # 返回值
    ///
    /// * `Ok(true)` - 本次调用完成了转换
    /// * `Ok(false)` - 批次已经处于终态
    async fn mark_failed(&self, id: Uuid, reason: &str) -> Result<bool, RepositoryError>;
}
