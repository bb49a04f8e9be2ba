// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 该模块定义了系统的核心业务实体，包括：
/// - 批次（batch）：一次提交的料号集合及其聚合状态
/// - 爬取单元（crawl_unit）：工作队列中的最小调度项
/// - 爬取日志（crawl_log）：每次终态尝试的审计记录
/// - 产品（product）：查询结果及结果缓冲中的信封
pub mod batch;
pub mod crawl_log;
pub mod crawl_unit;
pub mod product;
