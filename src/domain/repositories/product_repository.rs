// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::crawl_unit_repository::RepositoryError;
use crate::domain::models::product::{DistributorRow, PersistedProduct, ResultEnvelope};
use async_trait::async_trait;

/// 产品仓库特质
///
/// 两个操作都可安全重复执行：同一 crawl_id 的产品、同一 (产品, 分销商, SKU)
/// 的报价只会写入一次，重复写入被忽略。
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// 批量写入产品行
    ///
    /// # 返回值
    ///
    /// * `Ok(Vec<PersistedProduct>)` - 本批信封对应的全部产品行（包括此前已写入的）
    /// * `Err(RepositoryError)` - 写入失败，没有行被提交
    async fn insert_products(
        &self,
        envelopes: &[ResultEnvelope],
    ) -> Result<Vec<PersistedProduct>, RepositoryError>;

    /// 批量写入分销商报价子行，返回新写入的行数
    async fn insert_distributors(&self, rows: &[DistributorRow]) -> Result<u64, RepositoryError>;
}
