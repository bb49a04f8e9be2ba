// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// 爬取单元
///
/// 工作队列中最小的可调度项：一个料号在某个区域下的一次查询。
/// 单元只存在于工作队列中，被工作器领取后持有独占租约直到处理结束。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlUnit {
    /// 单元唯一标识符
    pub id: Uuid,
    /// 所属批次ID
    pub batch_id: Uuid,
    /// 单元负载，领取时按 [`UnitPayload`] 校验
    pub payload: serde_json::Value,
    /// 单元状态
    pub status: UnitStatus,
    /// 已领取次数（每次领取加一）
    pub attempt_count: i32,
    /// 尝试预算
    pub max_attempts: i32,
    /// 最早可领取时间，重试退避时设置
    pub scheduled_at: Option<DateTime<FixedOffset>>,
    /// 最近一次失败的错误信息
    pub last_error: Option<String>,
    /// 创建时间
    pub created_at: DateTime<FixedOffset>,
    /// 最近一次被领取的时间
    pub started_at: Option<DateTime<FixedOffset>>,
    /// 进入终态的时间
    pub completed_at: Option<DateTime<FixedOffset>>,
    /// 更新时间
    pub updated_at: DateTime<FixedOffset>,
    /// 租约令牌（持有者的工作器ID）
    pub lock_token: Option<Uuid>,
    /// 租约过期时间
    pub lock_expires_at: Option<DateTime<FixedOffset>>,
}

/// 单元负载
///
/// 队列消息的封闭标签联合，`job` 字段为标签。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "job", rename_all = "kebab-case")]
pub enum UnitPayload {
    /// 按料号查询产品及分销商报价
    CrawlMpn { mpn: String, region: String },
}

impl UnitPayload {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            UnitPayload::CrawlMpn { mpn, region } => json!({
                "job": "crawl-mpn",
                "mpn": mpn,
                "region": region,
            }),
        }
    }

    /// 料号
    pub fn identifier(&self) -> &str {
        match self {
            UnitPayload::CrawlMpn { mpn, .. } => mpn,
        }
    }

    /// 查询区域
    pub fn region(&self) -> &str {
        match self {
            UnitPayload::CrawlMpn { region, .. } => region,
        }
    }
}

/// 单元状态枚举
///
/// Queued → Active → Completed/Skipped/Failed，重试时 Active → Queued。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    #[default]
    Queued,
    Active,
    Completed,
    Skipped,
    Failed,
    Cancelled,
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            UnitStatus::Queued => write!(f, "queued"),
            UnitStatus::Active => write!(f, "active"),
            UnitStatus::Completed => write!(f, "completed"),
            UnitStatus::Skipped => write!(f, "skipped"),
            UnitStatus::Failed => write!(f, "failed"),
            UnitStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for UnitStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(UnitStatus::Queued),
            "active" => Ok(UnitStatus::Active),
            "completed" => Ok(UnitStatus::Completed),
            "skipped" => Ok(UnitStatus::Skipped),
            "failed" => Ok(UnitStatus::Failed),
            "cancelled" => Ok(UnitStatus::Cancelled),
            _ => Err(()),
        }
    }
}

/// 领域错误类型
#[derive(Error, Debug)]
pub enum DomainError {
    /// 负载无法解析为任何已知的单元类型
    #[error("Invalid unit payload: {0}")]
    InvalidPayload(String),

    /// 负载字段不符合领域规则
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl CrawlUnit {
    /// 创建一个新的待处理单元
    ///
    /// # 参数
    ///
    /// * `batch_id` - 所属批次
    /// * `payload` - 单元负载
    /// * `max_attempts` - 尝试预算
    pub fn new(batch_id: Uuid, payload: &UnitPayload, max_attempts: i32) -> Self {
        let now: DateTime<FixedOffset> = Utc::now().into();
        Self {
            id: Uuid::new_v4(),
            batch_id,
            payload: payload.to_json(),
            status: UnitStatus::Queued,
            attempt_count: 0,
            max_attempts,
            scheduled_at: None,
            last_error: None,
            created_at: now,
            started_at: None,
            completed_at: None,
            updated_at: now,
            lock_token: None,
            lock_expires_at: None,
        }
    }

    /// 解析并校验负载
    pub fn decode_payload(&self) -> Result<UnitPayload, DomainError> {
        let payload: UnitPayload = serde_json::from_value(self.payload.clone())
            .map_err(|e| DomainError::InvalidPayload(e.to_string()))?;

        match &payload {
            UnitPayload::CrawlMpn { mpn, region } => {
                if mpn.trim().is_empty() {
                    return Err(DomainError::ValidationError(
                        "mpn cannot be empty".to_string(),
                    ));
                }
                if region.trim().is_empty() {
                    return Err(DomainError::ValidationError(
                        "region cannot be empty".to_string(),
                    ));
                }
            }
        }

        Ok(payload)
    }

    /// 当前尝试失败后是否还能重试
    pub fn has_attempts_remaining(&self) -> bool {
        self.attempt_count < self.max_attempts
    }

    /// 领取次数已超出预算（最后一次尝试的租约过期后被再次领取）
    pub fn is_exhausted(&self) -> bool {
        self.attempt_count > self.max_attempts
    }
}
