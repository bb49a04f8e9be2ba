// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// 查询协作方返回的产品记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    /// 料号
    pub mpn: String,
    /// 产品页面地址
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    /// 中位价（原样保留来源的字符串形式）
    #[serde(default)]
    pub median_price: Option<String>,
    #[serde(default)]
    pub distributors: Vec<DistributorOffer>,
}

/// 分销商报价
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributorOffer {
    pub name: String,
    pub sku: String,
    pub stock: i64,
    pub min: i64,
    pub pkg: String,
    pub currency: String,
    /// 数量阶梯 → 单价
    #[serde(default)]
    pub prices: BTreeMap<String, f64>,
    pub updated: String,
}

/// 持久化时展开为列的价格阶梯
pub const PRICE_BREAKS: [&str; 5] = ["1", "10", "100", "1000", "10000"];

impl DistributorOffer {
    /// 指定数量阶梯的单价
    pub fn price_at(&self, quantity: &str) -> Option<f64> {
        self.prices.get(quantity).copied()
    }
}

/// 结果缓冲中的信封
///
/// 产品记录加上来源尝试与批次，交由聚合器批量写入。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    pub crawl_id: Uuid,
    pub batch_id: Uuid,
    pub product: ProductRecord,
}

/// 已持久化的产品行与其来源尝试的对应关系
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistedProduct {
    pub crawl_id: Uuid,
    pub product_id: Uuid,
}

/// 待写入的分销商子行
#[derive(Debug, Clone, PartialEq)]
pub struct DistributorRow {
    pub product_id: Uuid,
    pub offer: DistributorOffer,
}
