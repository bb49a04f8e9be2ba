// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::product::{DistributorRow, ResultEnvelope};
use crate::domain::repositories::crawl_log_repository::CrawlLogRepository;
use crate::domain::repositories::crawl_unit_repository::RepositoryError;
use crate::domain::repositories::product_repository::ProductRepository;
use crate::infrastructure::metrics::{
    AGGREGATOR_ROWS_WRITTEN_TOTAL, AGGREGATOR_STORAGE_ALERTS_TOTAL,
    AGGREGATOR_STORAGE_FAILURES_TOTAL,
};
use crate::queue::result_buffer::{BufferError, ResultBuffer};
use crate::utils::errors::WorkerError;
use crate::workers::worker::Worker;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use metrics::counter;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// 回填日志时的并发数
const LINK_CONCURRENCY: usize = 16;

/// 聚合器错误类型
///
/// 出现任何一种错误时缓冲区都保持不变，整批在下一次聚合时重试。
#[derive(Error, Debug)]
pub enum AggregatorError {
    /// 结果缓冲读取或移除失败
    #[error("Result buffer error: {0}")]
    Buffer(#[from] BufferError),

    /// 产品或分销商写入失败
    #[error("Storage error: {0}")]
    Storage(#[from] RepositoryError),
}

/// 聚合器配置
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// 聚合间隔
    pub interval: Duration,
    /// 每次最多取出的信封数
    pub batch_size: usize,
    /// 连续失败达到该次数后告警
    pub max_consecutive_failures: u32,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            batch_size: 200,
            max_consecutive_failures: 10,
        }
    }
}

/// 一次聚合的统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// 从缓冲区移除的记录数
    pub drained: usize,
    /// 本批对应的产品行数
    pub products: usize,
    /// 新写入的分销商行数
    pub distributors: u64,
    /// 无法解码而被跳过的记录数
    pub malformed: usize,
    /// 没有得到产品ID映射而被跳过的信封数
    pub unmapped: usize,
}

/// 批量聚合器
///
/// 定时从结果缓冲取出一批信封，一次写入产品与分销商报价，
/// 写入成功后才把这批记录从缓冲区移除。
pub struct BatchAggregator<B: ResultBuffer> {
    buffer: Arc<B>,
    products: Arc<dyn ProductRepository>,
    logs: Arc<dyn CrawlLogRepository>,
    config: AggregatorConfig,
    consecutive_failures: AtomicU32,
}

impl<B: ResultBuffer> BatchAggregator<B> {
    /// 创建新的聚合器实例
    pub fn new(
        buffer: Arc<B>,
        products: Arc<dyn ProductRepository>,
        logs: Arc<dyn CrawlLogRepository>,
        config: AggregatorConfig,
    ) -> Self {
        Self {
            buffer,
            products,
            logs,
            config,
            consecutive_failures: AtomicU32::new(0),
        }
    }

    /// 当前连续失败次数
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// 执行一次聚合
    ///
    /// # 返回值
    ///
    /// * `Ok(TickReport)` - 本次聚合的统计，缓冲区为空时全为零
    /// * `Err(AggregatorError)` - 写入失败，缓冲区未被修改
    pub async fn tick(&self) -> Result<TickReport, AggregatorError> {
        match self.drain_once().await {
            Ok(report) => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
                Ok(report)
            }
            Err(e) => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                counter!(AGGREGATOR_STORAGE_FAILURES_TOTAL).increment(1);

                if failures >= self.config.max_consecutive_failures {
                    counter!(AGGREGATOR_STORAGE_ALERTS_TOTAL).increment(1);
                    error!(
                        consecutive_failures = failures,
                        "ALERT: aggregator has failed {} ticks in a row, buffered results are not being persisted: {}",
                        failures,
                        e
                    );
                } else {
                    warn!(consecutive_failures = failures, "Aggregator tick failed: {}", e);
                }
                Err(e)
            }
        }
    }

    async fn drain_once(&self) -> Result<TickReport, AggregatorError> {
        let entries = self.buffer.peek(self.config.batch_size).await?;
        if entries.is_empty() {
            return Ok(TickReport::default());
        }

        let mut report = TickReport {
            drained: entries.len(),
            ..TickReport::default()
        };

        let mut envelopes: Vec<ResultEnvelope> = Vec::with_capacity(entries.len());
        for entry in &entries {
            match entry.decode() {
                Ok(envelope) => envelopes.push(envelope),
                Err(e) => {
                    warn!("Skipping malformed buffer entry: {}", e);
                    report.malformed += 1;
                }
            }
        }

        if !envelopes.is_empty() {
            let persisted = self.products.insert_products(&envelopes).await?;
            report.products = persisted.len();

            let mapping: HashMap<_, _> = persisted
                .iter()
                .map(|p| (p.crawl_id, p.product_id))
                .collect();

            let mut rows = Vec::new();
            let mut links = Vec::with_capacity(envelopes.len());
            for envelope in &envelopes {
                let Some(&product_id) = mapping.get(&envelope.crawl_id) else {
                    warn!(crawl_id = %envelope.crawl_id, "No product row for envelope, skipping");
                    report.unmapped += 1;
                    continue;
                };
                rows.extend(envelope.product.distributors.iter().map(|offer| DistributorRow {
                    product_id,
                    offer: offer.clone(),
                }));
                links.push((envelope.crawl_id, product_id));
            }

            report.distributors = self.products.insert_distributors(&rows).await?;

            stream::iter(links)
                .for_each_concurrent(LINK_CONCURRENCY, |(crawl_id, product_id)| async move {
                    match self.logs.link_product(crawl_id, product_id).await {
                        Ok(true) => {}
                        Ok(false) => warn!(%crawl_id, "No crawl log row to link product to"),
                        Err(e) => warn!(%crawl_id, "Failed to link product to crawl log: {}", e),
                    }
                })
                .await;
        }

        self.buffer.remove_front(entries.len()).await?;

        counter!(AGGREGATOR_ROWS_WRITTEN_TOTAL)
            .increment(report.products as u64 + report.distributors);
        info!(
            drained = report.drained,
            products = report.products,
            distributors = report.distributors,
            malformed = report.malformed,
            "Aggregator tick persisted buffered results"
        );
        Ok(report)
    }
}

#[async_trait]
impl<B: ResultBuffer> Worker for BatchAggregator<B> {
    async fn run(&self) -> Result<(), WorkerError> {
        info!(
            "Batch aggregator started, interval {}s",
            self.config.interval.as_secs()
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if let Err(e) = self.tick().await {
                debug!("Aggregator will retry next tick: {}", e);
            }
        }
    }

    fn name(&self) -> &str {
        "batch-aggregator"
    }
}
