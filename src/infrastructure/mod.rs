// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// 该模块包含系统的技术实现细节，提供对具体技术的抽象和封装。
/// 基础设施层负责与外部系统的交互，包括数据库、Redis 和料号查询服务。
///
/// 包含的子模块：
/// - 缓存（cache）：Redis客户端
/// - 数据库（database）：数据库连接和实体映射
/// - 查询（lookup）：料号查询协作方的HTTP实现
/// - 指标（metrics）：Prometheus 指标导出
/// - 仓库实现（repositories）：领域仓库接口的具体实现
pub mod cache;
pub mod database;
pub mod lookup;
pub mod metrics;
pub mod repositories;
