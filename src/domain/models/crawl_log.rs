// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 爬取结果日志
///
/// 每次终态尝试追加一行。创建后只允许回填 `product_id`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlLog {
    /// 本次尝试的唯一ID，同一单元的重复投递会得到不同的 crawl_id
    pub crawl_id: Uuid,
    pub batch_id: Uuid,
    /// 料号
    pub identifier: String,
    pub status: CrawlLogStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub duration_seconds: f64,
    /// 写入日志时该单元累计的尝试次数
    pub attempt_count: i32,
    pub distributor_count: Option<i32>,
    pub error_message: Option<String>,
    /// 对应产品行，聚合器持久化后回填
    pub product_id: Option<Uuid>,
}

impl CrawlLog {
    /// 创建一行日志，耗时由起止时间计算
    pub fn new(
        crawl_id: Uuid,
        batch_id: Uuid,
        identifier: impl Into<String>,
        status: CrawlLogStatus,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        attempt_count: i32,
    ) -> Self {
        let duration_seconds = (ended_at - started_at).num_milliseconds() as f64 / 1000.0;
        Self {
            crawl_id,
            batch_id,
            identifier: identifier.into(),
            status,
            started_at,
            ended_at,
            duration_seconds,
            attempt_count,
            distributor_count: None,
            error_message: None,
            product_id: None,
        }
    }

    pub fn with_distributor_count(mut self, count: usize) -> Self {
        self.distributor_count = Some(count as i32);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// 日志状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlLogStatus {
    Success,
    Failed,
    Skipped,
}

impl fmt::Display for CrawlLogStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CrawlLogStatus::Success => write!(f, "success"),
            CrawlLogStatus::Failed => write!(f, "failed"),
            CrawlLogStatus::Skipped => write!(f, "skipped"),
        }
    }
}

impl FromStr for CrawlLogStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(CrawlLogStatus::Success),
            "failed" => Ok(CrawlLogStatus::Failed),
            "skipped" => Ok(CrawlLogStatus::Skipped),
            _ => Err(()),
        }
    }
}
