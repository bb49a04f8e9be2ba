// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::product::ResultEnvelope;
use crate::infrastructure::cache::redis_client::RedisClient;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// 结果缓冲错误类型
#[derive(Error, Debug)]
pub enum BufferError {
    /// 后端不可用或命令失败
    #[error("Buffer backend error: {0}")]
    Backend(String),

    /// 信封无法序列化
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<anyhow::Error> for BufferError {
    fn from(error: anyhow::Error) -> Self {
        BufferError::Backend(error.to_string())
    }
}

/// 缓冲区中的一条原始记录
///
/// 保留原始文本，解码在消费方进行，格式错误的记录不会阻塞整个缓冲区。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedEntry {
    pub raw: String,
}

impl BufferedEntry {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// 解码为结果信封
    pub fn decode(&self) -> Result<ResultEnvelope, serde_json::Error> {
        serde_json::from_str(&self.raw)
    }
}

/// 结果缓冲特质
///
/// 生产者只在尾部追加；唯一的消费者先 `peek` 再在写入成功后 `remove_front`，
/// 因此被移除的恰好是已持久化的那一批。
#[async_trait]
pub trait ResultBuffer: Send + Sync {
    /// 追加一个信封
    async fn push(&self, envelope: &ResultEnvelope) -> Result<(), BufferError>;
    /// 读取头部至多 `limit` 条记录，不移除
    async fn peek(&self, limit: usize) -> Result<Vec<BufferedEntry>, BufferError>;
    /// 移除头部 `count` 条记录
    async fn remove_front(&self, count: usize) -> Result<(), BufferError>;
    /// 缓冲区长度
    async fn len(&self) -> Result<u64, BufferError>;
    /// 清空缓冲区，返回是否删除了数据
    async fn purge(&self) -> Result<bool, BufferError>;
}

/// 基于 Redis 列表的结果缓冲
#[derive(Clone)]
pub struct RedisResultBuffer {
    redis: RedisClient,
    key: String,
}

impl RedisResultBuffer {
    /// 创建结果缓冲
    ///
    /// # 参数
    ///
    /// * `redis` - Redis客户端
    /// * `key` - 列表键
    pub fn new(redis: RedisClient, key: impl Into<String>) -> Self {
        Self {
            redis,
            key: key.into(),
        }
    }
}

#[async_trait]
impl ResultBuffer for RedisResultBuffer {
    async fn push(&self, envelope: &ResultEnvelope) -> Result<(), BufferError> {
        let raw = serde_json::to_string(envelope)?;
        self.redis.rpush(&self.key, &raw).await?;
        Ok(())
    }

    async fn peek(&self, limit: usize) -> Result<Vec<BufferedEntry>, BufferError> {
        let values = self.redis.lrange_head(&self.key, limit).await?;
        Ok(values.into_iter().map(BufferedEntry::new).collect())
    }

    async fn remove_front(&self, count: usize) -> Result<(), BufferError> {
        self.redis.ltrim_head(&self.key, count).await?;
        Ok(())
    }

    async fn len(&self) -> Result<u64, BufferError> {
        let len = self.redis.llen(&self.key).await?;
        Ok(len)
    }

    async fn purge(&self) -> Result<bool, BufferError> {
        let removed = self.redis.del(&self.key).await?;
        Ok(removed > 0)
    }
}

#[async_trait]
impl<T: ResultBuffer + ?Sized> ResultBuffer for Arc<T> {
    async fn push(&self, envelope: &ResultEnvelope) -> Result<(), BufferError> {
        (**self).push(envelope).await
    }

    async fn peek(&self, limit: usize) -> Result<Vec<BufferedEntry>, BufferError> {
        (**self).peek(limit).await
    }

    async fn remove_front(&self, count: usize) -> Result<(), BufferError> {
        (**self).remove_front(count).await
    }

    async fn len(&self) -> Result<u64, BufferError> {
        (**self).len().await
    }

    async fn purge(&self) -> Result<bool, BufferError> {
        (**self).purge().await
    }
}
