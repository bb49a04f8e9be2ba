// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 爬取工作器池、批量聚合器以及负责启动和关闭它们的工作管理器
pub mod aggregator_worker;
pub mod crawl_worker;
pub mod manager;
pub mod worker;

pub use worker::Worker;
