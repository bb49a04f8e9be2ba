// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl_unit::{CrawlUnit, UnitStatus};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 单元状态响应数据传输对象
///
/// 单个料号在工作队列中的状态、已尝试次数和最近一次失败原因。
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UnitStatusResponse {
    /// 单元ID
    pub id: Uuid,
    /// 所属批次ID
    pub batch_id: Uuid,
    /// 料号，负载无法识别时为空
    pub identifier: Option<String>,
    /// 查询区域
    pub region: Option<String>,
    /// 单元状态
    pub status: UnitStatus,
    /// 已领取次数
    pub attempt_count: i32,
    /// 尝试预算
    pub max_attempts: i32,
    /// 最近一次失败原因
    pub last_error: Option<String>,
    /// 下次可领取时间
    pub scheduled_at: Option<DateTime<FixedOffset>>,
    pub created_at: DateTime<FixedOffset>,
    pub started_at: Option<DateTime<FixedOffset>>,
    pub completed_at: Option<DateTime<FixedOffset>>,
}

impl From<CrawlUnit> for UnitStatusResponse {
    fn from(unit: CrawlUnit) -> Self {
        let field = |name: &str| {
            unit.payload
                .get(name)
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        Self {
            identifier: field("mpn"),
            region: field("region"),
            id: unit.id,
            batch_id: unit.batch_id,
            status: unit.status,
            attempt_count: unit.attempt_count,
            max_attempts: unit.max_attempts,
            last_error: unit.last_error,
            scheduled_at: unit.scheduled_at,
            created_at: unit.created_at,
            started_at: unit.started_at,
            completed_at: unit.completed_at,
        }
    }
}
