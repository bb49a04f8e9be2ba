// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::product::ProductRecord;
use async_trait::async_trait;
use thiserror::Error;

/// 查询错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// 网络、超时、上游 5xx 等可重试错误
    #[error("Transient lookup error: {0}")]
    Transient(String),

    /// 重试也不会成功的错误
    #[error("Fatal lookup error: {0}")]
    Fatal(String),
}

impl LookupError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, LookupError::Transient(_))
    }
}

/// 料号查询协作方
///
/// 负责抓取与解析，对编排层不透明。
#[async_trait]
pub trait PartLookup: Send + Sync {
    /// 按料号和区域查询产品
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(ProductRecord))` - 找到产品
    /// * `Ok(None)` - 数据源没有该料号（不是错误，不重试）
    /// * `Err(LookupError)` - 查询失败
    async fn lookup(
        &self,
        identifier: &str,
        region: &str,
    ) -> Result<Option<ProductRecord>, LookupError>;
}
