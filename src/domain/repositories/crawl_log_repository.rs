// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::crawl_unit_repository::RepositoryError;
use crate::domain::models::crawl_log::CrawlLog;
use async_trait::async_trait;
use uuid::Uuid;

/// 爬取日志仓库特质
#[async_trait]
pub trait CrawlLogRepository: Send + Sync {
    /// 追加一行日志
    async fn create(&self, log: &CrawlLog) -> Result<(), RepositoryError>;
    /// 回填产品ID，返回是否找到对应日志
    async fn link_product(&self, crawl_id: Uuid, product_id: Uuid)
        -> Result<bool, RepositoryError>;
    /// 查找批次下的全部日志
    async fn find_by_batch_id(&self, batch_id: Uuid) -> Result<Vec<CrawlLog>, RepositoryError>;
}
