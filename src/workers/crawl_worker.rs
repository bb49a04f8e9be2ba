// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::batch::CounterKind;
use crate::domain::models::crawl_log::{CrawlLog, CrawlLogStatus};
use crate::domain::models::crawl_unit::CrawlUnit;
use crate::domain::models::product::{ProductRecord, ResultEnvelope};
use crate::domain::repositories::batch_repository::BatchRepository;
use crate::domain::repositories::crawl_log_repository::CrawlLogRepository;
use crate::domain::services::part_lookup::{LookupError, PartLookup};
use crate::infrastructure::metrics::{
    BATCHES_FINALIZED_TOTAL, CRAWL_LOOKUP_DURATION_SECONDS, CRAWL_UNITS_TOTAL,
};
use crate::queue::result_buffer::ResultBuffer;
use crate::queue::work_queue::{AckDisposition, QueueError, RetryDecision, WorkQueue};
use crate::utils::errors::WorkerError;
use crate::workers::worker::Worker;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn, Span};
use uuid::Uuid;

/// 单元处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    /// 查询到产品，结果已进入缓冲
    Succeeded,
    /// 数据源没有该料号
    Skipped,
    /// 可重试失败，已按退避重新排队
    FailedRetryable { retry_at: DateTime<Utc> },
    /// 永久失败，已计入批次失败数
    FailedPermanent { error: String },
    /// 租约在处理期间被回收，结果交给当前持有者
    LeaseLost,
}

impl UnitOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            UnitOutcome::Succeeded => "succeeded",
            UnitOutcome::Skipped => "skipped",
            UnitOutcome::FailedRetryable { .. } => "failed_retryable",
            UnitOutcome::FailedPermanent { .. } => "failed_permanent",
            UnitOutcome::LeaseLost => "lease_lost",
        }
    }
}

/// 爬取工作器配置
#[derive(Debug, Clone)]
pub struct CrawlWorkerConfig {
    /// 队列为空时的等待间隔
    pub poll_interval: Duration,
    /// 单次查询超时
    pub lookup_timeout: Duration,
}

impl Default for CrawlWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            lookup_timeout: Duration::from_secs(30),
        }
    }
}

/// 爬取工作器
///
/// 从工作队列领取单元，执行一次查询并记录结果：
/// 成功的结果进入结果缓冲，终态结果更新批次计数。
pub struct CrawlWorker<Q, B>
where
    Q: WorkQueue,
    B: ResultBuffer,
{
    queue: Arc<Q>,
    buffer: Arc<B>,
    batches: Arc<dyn BatchRepository>,
    logs: Arc<dyn CrawlLogRepository>,
    lookup: Arc<dyn PartLookup>,
    config: CrawlWorkerConfig,
    worker_id: Uuid,
    name: String,
}

impl<Q, B> CrawlWorker<Q, B>
where
    Q: WorkQueue,
    B: ResultBuffer,
{
    /// 创建新的爬取工作器实例
    pub fn new(
        queue: Arc<Q>,
        buffer: Arc<B>,
        batches: Arc<dyn BatchRepository>,
        logs: Arc<dyn CrawlLogRepository>,
        lookup: Arc<dyn PartLookup>,
        config: CrawlWorkerConfig,
    ) -> Self {
        let worker_id = Uuid::new_v4();
        Self {
            queue,
            buffer,
            batches,
            logs,
            lookup,
            config,
            worker_id,
            name: format!("crawl-worker-{}", worker_id),
        }
    }

    pub fn worker_id(&self) -> Uuid {
        self.worker_id
    }

    /// 领取并处理一个单元
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(UnitOutcome))` - 处理了一个单元
    /// * `Ok(None)` - 队列中没有到期的单元
    /// * `Err(WorkerError)` - 队列或存储调用失败，单元将在租约过期后重新投递
    ///
    /// 写结果日志和计数之前先续租；租约已被回收时返回 [`UnitOutcome::LeaseLost`]，
    /// 不写日志也不计数。
    pub async fn process_next(&self) -> Result<Option<UnitOutcome>, WorkerError> {
        let Some(unit) = self.queue.claim(self.worker_id).await? else {
            return Ok(None);
        };

        let outcome = self.process_unit(unit).await?;
        counter!(CRAWL_UNITS_TOTAL, "outcome" => outcome.label()).increment(1);
        Ok(Some(outcome))
    }

    #[instrument(
        skip(self, unit),
        fields(
            unit_id = %unit.id,
            batch_id = %unit.batch_id,
            attempt = unit.attempt_count,
            identifier = tracing::field::Empty
        )
    )]
    async fn process_unit(&self, unit: CrawlUnit) -> Result<UnitOutcome, WorkerError> {
        match self.settle(&unit).await {
            Err(WorkerError::QueueError(QueueError::LeaseLost(_))) => {
                warn!("Lease expired while processing, leaving the unit to its current holder");
                Ok(UnitOutcome::LeaseLost)
            }
            other => other,
        }
    }

    async fn settle(&self, unit: &CrawlUnit) -> Result<UnitOutcome, WorkerError> {
        let started_at = Utc::now();

        if let Err(e) = self.batches.mark_in_progress(unit.batch_id).await {
            warn!("Failed to mark batch in progress: {}", e);
        }

        let payload = match unit.decode_payload() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Quarantining unit with invalid payload: {}", e);
                let identifier = raw_identifier(unit);
                return self
                    .finish_permanent(unit, &identifier, e.to_string(), started_at)
                    .await;
            }
        };
        let identifier = payload.identifier().to_string();
        Span::current().record("identifier", identifier.as_str());

        if unit.is_exhausted() {
            let message = format!(
                "attempt budget of {} exhausted after lease expiry",
                unit.max_attempts
            );
            return self
                .finish_permanent(unit, &identifier, message, started_at)
                .await;
        }

        debug!("Looking up part");
        let result = self.timed_lookup(&identifier, payload.region()).await;

        match result {
            Ok(Some(record)) => self.finish_success(unit, &identifier, record, started_at).await,
            Ok(None) => self.finish_skipped(unit, &identifier, started_at).await,
            Err(e) if e.is_retryable() => {
                self.retry_or_fail(unit, &identifier, e.to_string(), started_at)
                    .await
            }
            Err(e) => {
                self.finish_permanent(unit, &identifier, e.to_string(), started_at)
                    .await
            }
        }
    }

    async fn timed_lookup(
        &self,
        identifier: &str,
        region: &str,
    ) -> Result<Option<ProductRecord>, LookupError> {
        let start = Instant::now();
        let result = tokio::time::timeout(
            self.config.lookup_timeout,
            self.lookup.lookup(identifier, region),
        )
        .await;
        histogram!(CRAWL_LOOKUP_DURATION_SECONDS).record(start.elapsed().as_secs_f64());

        result.unwrap_or_else(|_| {
            Err(LookupError::Transient(format!(
                "lookup timed out after {}s",
                self.config.lookup_timeout.as_secs_f64()
            )))
        })
    }

    async fn finish_success(
        &self,
        unit: &CrawlUnit,
        identifier: &str,
        record: ProductRecord,
        started_at: DateTime<Utc>,
    ) -> Result<UnitOutcome, WorkerError> {
        let crawl_id = Uuid::new_v4();
        let distributor_count = record.distributors.len();
        let envelope = ResultEnvelope {
            crawl_id,
            batch_id: unit.batch_id,
            product: record,
        };

        self.queue.renew_lease(unit).await?;

        // Buffer before logging: a failed push must not leave a success row
        if let Err(e) = self.buffer.push(&envelope).await {
            warn!("Failed to buffer result: {}", e);
            return self
                .retry_or_fail(unit, identifier, format!("result buffer: {}", e), started_at)
                .await;
        }

        let log = CrawlLog::new(
            crawl_id,
            unit.batch_id,
            identifier,
            CrawlLogStatus::Success,
            started_at,
            Utc::now(),
            unit.attempt_count,
        )
        .with_distributor_count(distributor_count);
        self.logs.create(&log).await?;

        self.queue.ack(unit, AckDisposition::Completed).await?;
        self.count(unit.batch_id, CounterKind::Success).await?;

        info!(distributor_count, "Unit succeeded");
        Ok(UnitOutcome::Succeeded)
    }

    async fn finish_skipped(
        &self,
        unit: &CrawlUnit,
        identifier: &str,
        started_at: DateTime<Utc>,
    ) -> Result<UnitOutcome, WorkerError> {
        self.queue.renew_lease(unit).await?;

        let log = CrawlLog::new(
            Uuid::new_v4(),
            unit.batch_id,
            identifier,
            CrawlLogStatus::Skipped,
            started_at,
            Utc::now(),
            unit.attempt_count,
        );
        self.logs.create(&log).await?;

        self.queue.ack(unit, AckDisposition::Skipped).await?;
        self.count(unit.batch_id, CounterKind::Skipped).await?;

        info!("Unit skipped, part not found");
        Ok(UnitOutcome::Skipped)
    }

    async fn retry_or_fail(
        &self,
        unit: &CrawlUnit,
        identifier: &str,
        error: String,
        started_at: DateTime<Utc>,
    ) -> Result<UnitOutcome, WorkerError> {
        match self.queue.fail_and_retry(unit, &error).await? {
            RetryDecision::Rescheduled(retry_at) => {
                warn!(%retry_at, "Attempt failed, retrying: {}", error);
                Ok(UnitOutcome::FailedRetryable { retry_at })
            }
            RetryDecision::Exhausted => {
                self.finish_permanent(unit, identifier, error, started_at)
                    .await
            }
        }
    }

    async fn finish_permanent(
        &self,
        unit: &CrawlUnit,
        identifier: &str,
        error: String,
        started_at: DateTime<Utc>,
    ) -> Result<UnitOutcome, WorkerError> {
        self.queue.renew_lease(unit).await?;

        let log = CrawlLog::new(
            Uuid::new_v4(),
            unit.batch_id,
            identifier,
            CrawlLogStatus::Failed,
            started_at,
            Utc::now(),
            unit.attempt_count,
        )
        .with_error(error.clone());
        self.logs.create(&log).await?;

        self.queue.fail_permanently(unit, &error).await?;
        self.count(unit.batch_id, CounterKind::Failed).await?;

        error!("Unit failed permanently: {}", error);
        Ok(UnitOutcome::FailedPermanent { error })
    }

    async fn count(&self, batch_id: Uuid, kind: CounterKind) -> Result<(), WorkerError> {
        let update = self.batches.increment_counter(batch_id, kind).await?;
        if !update.applied {
            warn!(%kind, "Batch counters already full, increment ignored");
        }
        if let Some(status) = update.finalized {
            counter!(BATCHES_FINALIZED_TOTAL, "status" => status.to_string()).increment(1);
        }
        Ok(())
    }
}

/// 负载无法解析时尽量取出料号用于日志
fn raw_identifier(unit: &CrawlUnit) -> String {
    unit.payload
        .get("mpn")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl<Q, B> Worker for CrawlWorker<Q, B>
where
    Q: WorkQueue,
    B: ResultBuffer,
{
    async fn run(&self) -> Result<(), WorkerError> {
        info!("Crawl worker {} started", self.worker_id);

        loop {
            match self.process_next().await {
                Ok(Some(_)) => {}
                Ok(None) => sleep(self.config.poll_interval).await,
                Err(e) => {
                    error!("Error processing unit: {}", e);
                    sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
