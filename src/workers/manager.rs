// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::batch_repository::BatchRepository;
use crate::domain::repositories::crawl_log_repository::CrawlLogRepository;
use crate::domain::repositories::product_repository::ProductRepository;
use crate::domain::services::part_lookup::PartLookup;
use crate::queue::result_buffer::ResultBuffer;
use crate::queue::scheduler::QueueScheduler;
use crate::queue::work_queue::WorkQueue;
use crate::workers::aggregator_worker::{AggregatorConfig, BatchAggregator};
use crate::workers::crawl_worker::{CrawlWorker, CrawlWorkerConfig};
use crate::workers::worker::Worker;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// 工作管理器
///
/// 持有爬取工作器池、批量聚合器和租约维护调度器的任务句柄。
pub struct WorkerManager<Q, B>
where
    Q: WorkQueue + 'static,
    B: ResultBuffer + 'static,
{
    queue: Arc<Q>,
    buffer: Arc<B>,
    batches: Arc<dyn BatchRepository>,
    logs: Arc<dyn CrawlLogRepository>,
    products: Arc<dyn ProductRepository>,
    lookup: Arc<dyn PartLookup>,
    handles: Vec<JoinHandle<()>>,
}

impl<Q, B> WorkerManager<Q, B>
where
    Q: WorkQueue + 'static,
    B: ResultBuffer + 'static,
{
    pub fn new(
        queue: Arc<Q>,
        buffer: Arc<B>,
        batches: Arc<dyn BatchRepository>,
        logs: Arc<dyn CrawlLogRepository>,
        products: Arc<dyn ProductRepository>,
        lookup: Arc<dyn PartLookup>,
    ) -> Self {
        Self {
            queue,
            buffer,
            batches,
            logs,
            products,
            lookup,
            handles: Vec::new(),
        }
    }

    /// 启动爬取工作器
    ///
    /// # 参数
    ///
    /// * `count` - 并发工作器数量
    /// * `config` - 每个工作器的配置
    pub fn start_workers(&mut self, count: usize, config: CrawlWorkerConfig) {
        for _ in 0..count {
            let worker = CrawlWorker::new(
                self.queue.clone(),
                self.buffer.clone(),
                self.batches.clone(),
                self.logs.clone(),
                self.lookup.clone(),
                config.clone(),
            );
            self.spawn(worker);
        }
        info!("Started {} crawl workers", count);
    }

    /// 启动批量聚合器
    pub fn start_aggregator(&mut self, config: AggregatorConfig) {
        let aggregator = BatchAggregator::new(
            self.buffer.clone(),
            self.products.clone(),
            self.logs.clone(),
            config,
        );
        self.spawn(aggregator);
    }

    /// 启动租约回收调度器
    pub fn start_maintenance(&mut self, period: Duration) {
        let scheduler = QueueScheduler::new(self.queue.clone(), period);
        self.handles.push(scheduler.start());
    }

    fn spawn<W: Worker + 'static>(&mut self, worker: W) {
        let handle = tokio::spawn(async move {
            if let Err(e) = worker.run().await {
                error!("Worker {} stopped: {}", worker.name(), e);
            }
        });
        self.handles.push(handle);
    }

    /// 停止所有任务
    ///
    /// 正在处理中的单元会在租约过期后被重新投递
    pub fn shutdown(&mut self) {
        info!("Shutting down workers...");
        for handle in self.handles.drain(..) {
            handle.abort();
        }
        info!("Workers shut down successfully");
    }
}
