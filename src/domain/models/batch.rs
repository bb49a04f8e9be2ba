// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 批次状态记录
///
/// 每个批次一行，由工作器通过原子计数操作更新。
/// 任意时刻 `success_count + failed_count + skipped_count <= total_units`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// 批次唯一标识符
    pub id: Uuid,
    /// 请求名称（调用方提供，可选）
    pub request_name: Option<String>,
    /// 来源文件名（可选）
    pub file_name: Option<String>,
    /// 查询区域/币种
    pub region: String,
    /// 声明的单元总数
    pub total_units: i32,
    /// 成功单元数
    pub success_count: i32,
    /// 永久失败单元数
    pub failed_count: i32,
    /// 跳过（未找到）单元数
    pub skipped_count: i32,
    /// 批次状态
    pub status: BatchStatus,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 首个单元被领取的时间
    pub started_at: Option<DateTime<Utc>>,
    /// 进入终态的时间
    pub completed_at: Option<DateTime<Utc>>,
}

impl Batch {
    /// 创建一个待处理的批次
    pub fn new(
        total_units: i32,
        region: String,
        request_name: Option<String>,
        file_name: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_name,
            file_name,
            region,
            total_units,
            success_count: 0,
            failed_count: 0,
            skipped_count: 0,
            status: BatchStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// 已到达终态的单元数
    pub fn processed_units(&self) -> i32 {
        self.success_count + self.failed_count + self.skipped_count
    }

    /// 所有单元是否都已到达终态
    pub fn is_fully_processed(&self) -> bool {
        self.processed_units() >= self.total_units
    }
}

/// 批次状态枚举
///
/// 状态转换：Pending → InProgress → Completed/Failed，
/// 分发失败时可从 Pending 直接进入 Failed。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// 已创建，尚无单元被领取
    #[default]
    Pending,
    /// 至少一个单元已被领取
    InProgress,
    /// 所有单元已到达终态
    Completed,
    /// 批次失败
    Failed,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Failed)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BatchStatus::Pending => write!(f, "pending"),
            BatchStatus::InProgress => write!(f, "in_progress"),
            BatchStatus::Completed => write!(f, "completed"),
            BatchStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for BatchStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BatchStatus::Pending),
            "in_progress" => Ok(BatchStatus::InProgress),
            "completed" => Ok(BatchStatus::Completed),
            "failed" => Ok(BatchStatus::Failed),
            _ => Err(()),
        }
    }
}

/// 批次计数器种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterKind {
    Success,
    Failed,
    Skipped,
}

impl fmt::Display for CounterKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CounterKind::Success => write!(f, "success"),
            CounterKind::Failed => write!(f, "failed"),
            CounterKind::Skipped => write!(f, "skipped"),
        }
    }
}

/// 批次终结策略
///
/// 决定含有永久失败单元的批次最终落在哪个终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// 总是以 Completed 结束，失败数体现在 failed_count 中
    #[default]
    Complete,
    /// 只要有任何单元永久失败就以 Failed 结束
    Fail,
}

impl FailurePolicy {
    /// 根据失败数给出终态
    pub fn terminal_status(&self, failed_count: i32) -> BatchStatus {
        match self {
            FailurePolicy::Fail if failed_count > 0 => BatchStatus::Failed,
            _ => BatchStatus::Completed,
        }
    }
}

/// 一次计数器自增的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterUpdate {
    /// 计数器是否真的增加了（总数已满时为 false）
    pub applied: bool,
    /// 本次调用是否执行了终态转换
    pub finalized: Option<BatchStatus>,
}
