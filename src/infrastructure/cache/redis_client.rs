// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use anyhow::Result;
use redis::AsyncCommands;

/// Redis客户端
///
/// 提供结果缓冲所需的列表操作
#[derive(Clone)]
pub struct RedisClient {
    /// Redis客户端
    client: redis::Client,
}

impl RedisClient {
    /// 创建新的Redis客户端实例
    ///
    /// # 参数
    ///
    /// * `redis_url` - Redis连接URL
    ///
    /// # 返回值
    ///
    /// * `Ok(RedisClient)` - Redis客户端实例
    /// * `Err(anyhow::Error)` - URL无效
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// 检查连接是否可用
    pub async fn ping(&self) -> Result<()> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        redis::cmd("PING").query_async::<String>(&mut con).await?;
        Ok(())
    }

    /// 追加到列表尾部
    ///
    /// # 返回值
    ///
    /// * `Ok(u64)` - 追加后的列表长度
    /// * `Err(anyhow::Error)` - 追加失败
    pub async fn rpush(&self, key: &str, value: &str) -> Result<u64> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = con.rpush(key, value).await?;
        Ok(len)
    }

    /// 读取列表头部的至多 `count` 个元素，不移除
    pub async fn lrange_head(&self, key: &str, count: usize) -> Result<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let values: Vec<String> = con.lrange(key, 0, count as isize - 1).await?;
        Ok(values)
    }

    /// 移除列表头部的 `count` 个元素
    pub async fn ltrim_head(&self, key: &str, count: usize) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let mut con = self.client.get_multiplexed_async_connection().await?;
        con.ltrim::<_, ()>(key, count as isize, -1).await?;
        Ok(())
    }

    /// 列表长度
    pub async fn llen(&self, key: &str) -> Result<u64> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let len: u64 = con.llen(key).await?;
        Ok(len)
    }

    /// 删除键，返回被删除的键数量
    pub async fn del(&self, key: &str) -> Result<u64> {
        let mut con = self.client.get_multiplexed_async_connection().await?;
        let removed: u64 = con.del(key).await?;
        Ok(removed)
    }
}
