// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// 创建批次请求
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateBatchRequest {
    /// 料号列表，去除首尾空白后丢弃空项
    #[validate(length(min = 1, message = "identifiers cannot be empty"))]
    pub identifiers: Vec<String>,
    /// 查询区域，缺省时使用配置中的默认区域
    #[validate(length(min = 1, max = 16, message = "region must be 1-16 characters"))]
    pub region: Option<String>,
    #[validate(length(max = 255))]
    pub request_name: Option<String>,
    #[validate(length(max = 255))]
    pub file_name: Option<String>,
}

impl CreateBatchRequest {
    /// 去除首尾空白后的非空料号
    pub fn normalized_identifiers(&self) -> Vec<String> {
        self.identifiers
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// 批次列表查询参数
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ListBatchesQuery {
    #[validate(range(min = 1, max = 500))]
    pub limit: Option<u64>,
}

impl ListBatchesQuery {
    pub const DEFAULT_LIMIT: u64 = 50;

    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }
}
