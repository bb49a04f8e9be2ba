// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 仓库接口模块
///
/// 该模块定义了领域层的仓库接口，遵循依赖倒置原则。
/// 具体实现由基础设施层提供。
///
/// 包含的仓库接口：
/// - 批次仓库（batch_repository）：批次状态记录与原子计数
/// - 爬取日志仓库（crawl_log_repository）：每次终态尝试的审计日志
/// - 爬取单元仓库（crawl_unit_repository）：工作队列的持久化
/// - 产品仓库（product_repository）：产品与分销商报价的批量写入
pub mod batch_repository;
pub mod crawl_log_repository;
pub mod crawl_unit_repository;
pub mod product_repository;
