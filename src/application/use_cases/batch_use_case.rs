// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::{
    application::dto::{
        batch_request::CreateBatchRequest, unit_status_response::UnitStatusResponse,
    },
    config::settings::BatchSettings,
    domain::{
        models::{
            batch::Batch,
            crawl_log::CrawlLog,
            crawl_unit::{CrawlUnit, UnitPayload},
        },
        repositories::{
            batch_repository::BatchRepository, crawl_log_repository::CrawlLogRepository,
            crawl_unit_repository::RepositoryError,
        },
    },
    infrastructure::metrics::BATCHES_CREATED_TOTAL,
    queue::work_queue::{QueueError, WorkQueue},
    utils::retry_policy::RetryPolicy,
};
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// 分发失败后标记批次失败的最多尝试次数
const MARK_FAILED_ATTEMPTS: u32 = 3;

#[derive(Error, Debug)]
pub enum BatchUseCaseError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Batch {batch_id} failed: only {accepted} of {requested} units were enqueued")]
    PartialEnqueue {
        batch_id: Uuid,
        accepted: usize,
        requested: usize,
    },
    #[error("Batch {batch_id} failed: enqueue error: {source}")]
    EnqueueFailed {
        batch_id: Uuid,
        #[source]
        source: QueueError,
    },
    #[error("Batch {batch_id} could not be marked failed after dispatch error ({reason}): {source}")]
    AbortFailed {
        batch_id: Uuid,
        reason: String,
        #[source]
        source: RepositoryError,
    },
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
    #[error("Batch not found")]
    NotFound,
    #[error("Unit not found")]
    UnitNotFound,
}

impl BatchUseCaseError {
    /// 分发失败时对应的批次ID
    pub fn batch_id(&self) -> Option<Uuid> {
        match self {
            BatchUseCaseError::PartialEnqueue { batch_id, .. }
            | BatchUseCaseError::EnqueueFailed { batch_id, .. }
            | BatchUseCaseError::AbortFailed { batch_id, .. } => Some(*batch_id),
            _ => None,
        }
    }
}

/// 批次分发用例
///
/// 创建批次记录并把每个料号作为一个单元放入工作队列。
/// 单元要么全部入队，要么批次被标记为失败且剩余排队单元被取消。
/// 同时提供批次、单元和结果日志的查询。
pub struct BatchUseCase {
    batches: Arc<dyn BatchRepository>,
    queue: Arc<dyn WorkQueue>,
    logs: Arc<dyn CrawlLogRepository>,
    settings: BatchSettings,
    max_attempts: i32,
}

impl BatchUseCase {
    pub fn new(
        batches: Arc<dyn BatchRepository>,
        queue: Arc<dyn WorkQueue>,
        logs: Arc<dyn CrawlLogRepository>,
        settings: BatchSettings,
        max_attempts: u32,
    ) -> Self {
        Self {
            batches,
            queue,
            logs,
            settings,
            max_attempts: max_attempts.min(i32::MAX as u32) as i32,
        }
    }

    #[instrument(skip(self, request), fields(requested = request.identifiers.len()))]
    pub async fn create_batch(&self, request: CreateBatchRequest) -> Result<Batch, BatchUseCaseError> {
        request
            .validate()
            .map_err(|e| BatchUseCaseError::Validation(e.to_string()))?;

        let identifiers = request.normalized_identifiers();
        if identifiers.is_empty() {
            return Err(BatchUseCaseError::Validation(
                "identifiers cannot be empty".to_string(),
            ));
        }
        if identifiers.len() > self.settings.max_identifiers {
            return Err(BatchUseCaseError::Validation(format!(
                "too many identifiers: {} (max {})",
                identifiers.len(),
                self.settings.max_identifiers
            )));
        }

        let region = request
            .region
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(&self.settings.default_region)
            .to_string();

        let requested = identifiers.len();
        let batch = self
            .batches
            .create(&Batch::new(
                requested as i32,
                region.clone(),
                request.request_name,
                request.file_name,
            ))
            .await?;
        counter!(BATCHES_CREATED_TOTAL).increment(1);

        let units: Vec<CrawlUnit> = identifiers
            .into_iter()
            .map(|mpn| {
                let payload = UnitPayload::CrawlMpn {
                    mpn,
                    region: region.clone(),
                };
                CrawlUnit::new(batch.id, &payload, self.max_attempts)
            })
            .collect();

        match self.queue.enqueue_bulk(units).await {
            Ok(accepted) if accepted == requested => {
                info!(batch_id = %batch.id, units = requested, "Batch dispatched");
                Ok(batch)
            }
            Ok(accepted) => {
                let reason = format!("only {} of {} units were enqueued", accepted, requested);
                self.abort(batch.id, &reason).await?;
                Err(BatchUseCaseError::PartialEnqueue {
                    batch_id: batch.id,
                    accepted,
                    requested,
                })
            }
            Err(e) => {
                self.abort(batch.id, &format!("enqueue error: {}", e))
                    .await?;
                Err(BatchUseCaseError::EnqueueFailed {
                    batch_id: batch.id,
                    source: e,
                })
            }
        }
    }

    /// 标记批次失败并取消已入队的单元
    ///
    /// 取消失败只记录日志；标记失败在重试后仍不成功时返回 [`BatchUseCaseError::AbortFailed`]。
    async fn abort(&self, batch_id: Uuid, reason: &str) -> Result<(), BatchUseCaseError> {
        error!(%batch_id, "Dispatch failed: {}", reason);

        let marked = self.mark_failed_with_retry(batch_id, reason).await;
        match self.queue.cancel_batch(batch_id).await {
            Ok(cancelled) => info!(%batch_id, cancelled, "Cancelled queued units"),
            Err(e) => warn!(%batch_id, "Failed to cancel queued units: {}", e),
        }

        marked.map_err(|source| BatchUseCaseError::AbortFailed {
            batch_id,
            reason: reason.to_string(),
            source,
        })
    }

    async fn mark_failed_with_retry(
        &self,
        batch_id: Uuid,
        reason: &str,
    ) -> Result<(), RepositoryError> {
        let backoff = RetryPolicy::deterministic(Duration::from_millis(100));
        let mut attempt = 1;
        loop {
            match self.batches.mark_failed(batch_id, reason).await {
                Ok(_) => return Ok(()),
                Err(e) if attempt < MARK_FAILED_ATTEMPTS => {
                    warn!(%batch_id, attempt, "Failed to mark batch failed, retrying: {}", e);
                    sleep(backoff.calculate_backoff(attempt)).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(%batch_id, "Giving up marking batch failed: {}", e);
                    return Err(e);
                }
            }
        }
    }

    pub async fn get_batch_status(&self, batch_id: Uuid) -> Result<Batch, BatchUseCaseError> {
        self.batches
            .find_by_id(batch_id)
            .await?
            .ok_or(BatchUseCaseError::NotFound)
    }

    pub async fn list_batches(&self, limit: u64) -> Result<Vec<Batch>, BatchUseCaseError> {
        Ok(self.batches.list_recent(limit).await?)
    }

    /// 查看单个单元的状态
    pub async fn get_unit_status(
        &self,
        unit_id: Uuid,
    ) -> Result<UnitStatusResponse, BatchUseCaseError> {
        self.queue
            .find_unit(unit_id)
            .await?
            .map(Into::into)
            .ok_or(BatchUseCaseError::UnitNotFound)
    }

    /// 批次下全部单元的状态
    pub async fn list_batch_units(
        &self,
        batch_id: Uuid,
    ) -> Result<Vec<UnitStatusResponse>, BatchUseCaseError> {
        self.get_batch_status(batch_id).await?;
        let units = self.queue.units_for_batch(batch_id).await?;
        Ok(units.into_iter().map(Into::into).collect())
    }

    /// 批次下的结果日志
    pub async fn list_batch_logs(&self, batch_id: Uuid) -> Result<Vec<CrawlLog>, BatchUseCaseError> {
        self.get_batch_status(batch_id).await?;
        Ok(self.logs.find_by_batch_id(batch_id).await?)
    }
}
