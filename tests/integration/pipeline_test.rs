// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use crate::helpers::{
    product, InMemoryBatchRepository, InMemoryCrawlLogRepository, InMemoryProductRepository,
    InMemoryResultBuffer, InMemoryWorkQueue, Script, ScriptedLookup,
};
use mpncrawl::application::dto::batch_request::CreateBatchRequest;
use mpncrawl::application::use_cases::batch_use_case::BatchUseCase;
use mpncrawl::config::settings::BatchSettings;
use mpncrawl::domain::models::batch::{Batch, BatchStatus, FailurePolicy};
use mpncrawl::domain::models::crawl_log::CrawlLogStatus;
use mpncrawl::domain::models::crawl_unit::{CrawlUnit, UnitPayload, UnitStatus};
use mpncrawl::domain::repositories::batch_repository::BatchRepository;
use mpncrawl::domain::repositories::crawl_log_repository::CrawlLogRepository;
use mpncrawl::domain::repositories::product_repository::ProductRepository;
use mpncrawl::domain::models::product::ProductRecord;
use mpncrawl::domain::services::part_lookup::{LookupError, PartLookup};
use mpncrawl::queue::work_queue::WorkQueue;
use mpncrawl::workers::aggregator_worker::{AggregatorConfig, BatchAggregator};
use mpncrawl::workers::crawl_worker::{CrawlWorker, CrawlWorkerConfig, UnitOutcome};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const MAX_ATTEMPTS: u32 = 3;

struct Pipeline {
    queue: Arc<InMemoryWorkQueue>,
    buffer: Arc<InMemoryResultBuffer>,
    batches: Arc<InMemoryBatchRepository>,
    logs: Arc<InMemoryCrawlLogRepository>,
    products: Arc<InMemoryProductRepository>,
    lookup: Arc<ScriptedLookup>,
    dispatcher: BatchUseCase,
}

impl Pipeline {
    fn new(lookup: ScriptedLookup, policy: FailurePolicy) -> Self {
        let queue = Arc::new(InMemoryWorkQueue::new());
        let batches = Arc::new(InMemoryBatchRepository::new(policy));
        let work_queue: Arc<dyn WorkQueue> = queue.clone();
        let batch_repo: Arc<dyn BatchRepository> = batches.clone();
        let logs = Arc::new(InMemoryCrawlLogRepository::new());
        let log_repo: Arc<dyn CrawlLogRepository> = logs.clone();
        let dispatcher = BatchUseCase::new(
            batch_repo,
            work_queue,
            log_repo,
            BatchSettings {
                default_region: "USD".to_string(),
                max_identifiers: 100,
                failure_policy: policy,
            },
            MAX_ATTEMPTS,
        );

        Self {
            queue,
            buffer: Arc::new(InMemoryResultBuffer::new()),
            batches,
            logs,
            products: Arc::new(InMemoryProductRepository::new()),
            lookup: Arc::new(lookup),
            dispatcher,
        }
    }

    fn worker(&self) -> CrawlWorker<InMemoryWorkQueue, InMemoryResultBuffer> {
        self.worker_with(self.lookup.clone())
    }

    fn worker_with(
        &self,
        lookup: Arc<dyn PartLookup>,
    ) -> CrawlWorker<InMemoryWorkQueue, InMemoryResultBuffer> {
        let batches: Arc<dyn BatchRepository> = self.batches.clone();
        let logs: Arc<dyn CrawlLogRepository> = self.logs.clone();
        CrawlWorker::new(
            self.queue.clone(),
            self.buffer.clone(),
            batches,
            logs,
            lookup,
            CrawlWorkerConfig {
                poll_interval: Duration::from_millis(10),
                lookup_timeout: Duration::from_secs(5),
            },
        )
    }

    fn aggregator(&self) -> BatchAggregator<InMemoryResultBuffer> {
        let products: Arc<dyn ProductRepository> = self.products.clone();
        let logs: Arc<dyn CrawlLogRepository> = self.logs.clone();
        BatchAggregator::new(
            self.buffer.clone(),
            products,
            logs,
            AggregatorConfig::default(),
        )
    }

    async fn submit(&self, identifiers: &[&str]) -> Batch {
        self.dispatcher
            .create_batch(CreateBatchRequest {
                identifiers: identifiers.iter().map(|s| s.to_string()).collect(),
                region: None,
                request_name: Some("nightly".to_string()),
                file_name: None,
            })
            .await
            .unwrap()
    }
}

/// 查询期间租约过期，另一个工作器领走了同一个单元
struct LeaseExpiringLookup {
    queue: Arc<InMemoryWorkQueue>,
    record: ProductRecord,
    other_worker: Uuid,
}

#[async_trait]
impl PartLookup for LeaseExpiringLookup {
    async fn lookup(
        &self,
        _identifier: &str,
        _region: &str,
    ) -> Result<Option<ProductRecord>, LookupError> {
        self.queue.release_expired_leases().await.unwrap();
        self.queue.claim(self.other_worker).await.unwrap();
        Ok(Some(self.record.clone()))
    }
}

async fn run_until_idle(
    worker: &CrawlWorker<InMemoryWorkQueue, InMemoryResultBuffer>,
) -> Vec<UnitOutcome> {
    let mut outcomes = Vec::new();
    while let Some(outcome) = worker.process_next().await.unwrap() {
        outcomes.push(outcome);
    }
    outcomes
}

#[tokio::test]
async fn test_found_not_found_and_failing_units_complete_the_batch() {
    let lookup = ScriptedLookup::new()
        .with("A", Script::Found(product("A")))
        .with("B", Script::NotFound)
        .with("C", Script::Transient);
    let pipeline = Pipeline::new(lookup, FailurePolicy::Complete);

    let batch = pipeline.submit(&["A", "B", "C"]).await;
    assert_eq!(batch.total_units, 3);
    assert_eq!(batch.status, BatchStatus::Pending);

    let outcomes = run_until_idle(&pipeline.worker()).await;
    let retryable = outcomes
        .iter()
        .filter(|o| matches!(o, UnitOutcome::FailedRetryable { .. }))
        .count();
    assert_eq!(retryable, 2);
    assert!(outcomes.contains(&UnitOutcome::Succeeded));
    assert!(outcomes.contains(&UnitOutcome::Skipped));

    let batch = pipeline.batches.get(batch.id).unwrap();
    assert_eq!(batch.success_count, 1);
    assert_eq!(batch.skipped_count, 1);
    assert_eq!(batch.failed_count, 1);
    assert_eq!(batch.status, BatchStatus::Completed);
    assert!(batch.started_at.is_some());
    assert!(batch.completed_at.is_some());

    let logs = pipeline.logs.all();
    assert_eq!(logs.len(), 3);
    let failed = pipeline.logs.for_identifier("C");
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].status, CrawlLogStatus::Failed);
    assert_eq!(failed[0].attempt_count, MAX_ATTEMPTS as i32);
    assert!(failed[0].error_message.is_some());
    assert_eq!(pipeline.lookup.calls("C"), MAX_ATTEMPTS);

    assert_eq!(pipeline.buffer.size(), 1);
    let report = pipeline.aggregator().tick().await.unwrap();
    assert_eq!(report.drained, 1);
    assert_eq!(report.products, 1);
    assert_eq!(report.distributors, 2);
    assert_eq!(pipeline.buffer.size(), 0);

    let success = &pipeline.logs.for_identifier("A")[0];
    assert_eq!(success.status, CrawlLogStatus::Success);
    assert_eq!(success.distributor_count, Some(2));
    assert_eq!(
        success.product_id,
        pipeline.products.product_for(success.crawl_id)
    );
}

#[tokio::test]
async fn test_fatal_lookup_error_is_not_retried() {
    let lookup = ScriptedLookup::new().with("BAD", Script::Fatal);
    let pipeline = Pipeline::new(lookup, FailurePolicy::Complete);
    let batch = pipeline.submit(&["BAD"]).await;

    let outcomes = run_until_idle(&pipeline.worker()).await;

    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], UnitOutcome::FailedPermanent { .. }));
    assert_eq!(pipeline.lookup.calls("BAD"), 1);
    assert_eq!(pipeline.queue.count_with_status(UnitStatus::Failed), 1);

    let batch = pipeline.batches.get(batch.id).unwrap();
    assert_eq!(batch.failed_count, 1);
    assert_eq!(batch.status, BatchStatus::Completed);
}

#[tokio::test]
async fn test_fail_policy_finalizes_batch_with_failures_as_failed() {
    let lookup = ScriptedLookup::new()
        .with("A", Script::Found(product("A")))
        .with("BAD", Script::Fatal);
    let pipeline = Pipeline::new(lookup, FailurePolicy::Fail);
    let batch = pipeline.submit(&["A", "BAD"]).await;

    run_until_idle(&pipeline.worker()).await;

    let batch = pipeline.batches.get(batch.id).unwrap();
    assert_eq!(batch.success_count, 1);
    assert_eq!(batch.failed_count, 1);
    assert_eq!(batch.status, BatchStatus::Failed);
}

#[tokio::test]
async fn test_transient_errors_recover_within_budget() {
    let lookup = ScriptedLookup::new().with("A", Script::TransientThenFound(2, product("A")));
    let pipeline = Pipeline::new(lookup, FailurePolicy::Complete);
    let batch = pipeline.submit(&["A"]).await;

    let outcomes = run_until_idle(&pipeline.worker()).await;

    assert_eq!(outcomes.last(), Some(&UnitOutcome::Succeeded));
    assert_eq!(pipeline.lookup.calls("A"), 3);
    let logs = pipeline.logs.all();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].attempt_count, 3);
    assert_eq!(
        pipeline.batches.get(batch.id).unwrap().status,
        BatchStatus::Completed
    );
}

#[tokio::test]
async fn test_buffer_push_failure_retries_without_logging_success() {
    let lookup = ScriptedLookup::new().with("A", Script::Found(product("A")));
    let pipeline = Pipeline::new(lookup, FailurePolicy::Complete);
    pipeline.buffer.fail_next_pushes(1);
    let batch = pipeline.submit(&["A"]).await;
    let worker = pipeline.worker();

    let first = worker.process_next().await.unwrap().unwrap();
    assert!(matches!(first, UnitOutcome::FailedRetryable { .. }));
    assert!(pipeline.logs.all().is_empty());
    assert_eq!(pipeline.buffer.size(), 0);
    assert_eq!(pipeline.batches.get(batch.id).unwrap().success_count, 0);

    let second = worker.process_next().await.unwrap().unwrap();
    assert_eq!(second, UnitOutcome::Succeeded);
    assert_eq!(pipeline.logs.all().len(), 1);
    assert_eq!(pipeline.buffer.size(), 1);
    assert_eq!(pipeline.buffer.envelopes()[0].batch_id, batch.id);
    assert_eq!(pipeline.batches.get(batch.id).unwrap().success_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_lookup_timeout_counts_as_transient() {
    let lookup = ScriptedLookup::new().with("SLOW", Script::Hang);
    let pipeline = Pipeline::new(lookup, FailurePolicy::Complete);
    let batch = pipeline.submit(&["SLOW"]).await;

    let outcomes = run_until_idle(&pipeline.worker()).await;

    assert_eq!(outcomes.len(), MAX_ATTEMPTS as usize);
    match outcomes.last() {
        Some(UnitOutcome::FailedPermanent { error }) => assert!(error.contains("timed out")),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(pipeline.batches.get(batch.id).unwrap().failed_count, 1);
}

#[tokio::test]
async fn test_invalid_payload_is_quarantined() {
    let pipeline = Pipeline::new(ScriptedLookup::new(), FailurePolicy::Complete);
    let batch = pipeline
        .batches
        .create(&Batch::new(1, "USD".to_string(), None, None))
        .await
        .unwrap();

    let mut unit = CrawlUnit::new(
        batch.id,
        &UnitPayload::CrawlMpn {
            mpn: "X".to_string(),
            region: "USD".to_string(),
        },
        3,
    );
    unit.payload = json!({ "job": "save-result", "mpn": "X" });
    pipeline.queue.insert(unit);

    let outcomes = run_until_idle(&pipeline.worker()).await;

    assert_eq!(outcomes.len(), 1);
    assert!(matches!(outcomes[0], UnitOutcome::FailedPermanent { .. }));
    assert_eq!(pipeline.lookup.calls("X"), 0);
    let logs = pipeline.logs.all();
    assert_eq!(logs[0].identifier, "X");
    assert_eq!(logs[0].status, CrawlLogStatus::Failed);

    let batch = pipeline.batches.get(batch.id).unwrap();
    assert_eq!(batch.failed_count, 1);
    assert_eq!(batch.status, BatchStatus::Completed);
}

#[tokio::test]
async fn test_unit_redelivered_after_final_attempt_fails_without_lookup() {
    let lookup = ScriptedLookup::new().with("A", Script::Found(product("A")));
    let pipeline = Pipeline::new(lookup, FailurePolicy::Complete);
    let batch = pipeline
        .batches
        .create(&Batch::new(1, "USD".to_string(), None, None))
        .await
        .unwrap();

    let mut unit = CrawlUnit::new(
        batch.id,
        &UnitPayload::CrawlMpn {
            mpn: "A".to_string(),
            region: "USD".to_string(),
        },
        MAX_ATTEMPTS as i32,
    );
    unit.attempt_count = MAX_ATTEMPTS as i32;
    let unit_id = unit.id;
    pipeline.queue.insert(unit);

    let outcome = pipeline.worker().process_next().await.unwrap().unwrap();

    assert!(matches!(outcome, UnitOutcome::FailedPermanent { .. }));
    assert_eq!(pipeline.lookup.calls("A"), 0);
    assert_eq!(
        pipeline.queue.unit(unit_id).unwrap().status,
        UnitStatus::Failed
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_workers_finalize_batch_once() {
    let identifiers: Vec<String> = (0..40).map(|i| format!("PART-{}", i)).collect();
    let mut lookup = ScriptedLookup::new();
    for (i, id) in identifiers.iter().enumerate() {
        let script = if i % 4 == 0 {
            Script::NotFound
        } else {
            Script::Found(product(id))
        };
        lookup = lookup.with(id, script);
    }
    let pipeline = Arc::new(Pipeline::new(lookup, FailurePolicy::Complete));
    let refs: Vec<&str> = identifiers.iter().map(String::as_str).collect();
    let batch = pipeline.submit(&refs).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let worker = pipeline.worker();
        handles.push(tokio::spawn(async move { run_until_idle(&worker).await.len() }));
    }
    let mut processed = 0;
    for handle in handles {
        processed += handle.await.unwrap();
    }

    assert_eq!(processed, 40);
    let batch = pipeline.batches.get(batch.id).unwrap();
    assert_eq!(batch.success_count, 30);
    assert_eq!(batch.skipped_count, 10);
    assert_eq!(batch.processed_units(), batch.total_units);
    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(pipeline.batches.terminal_transitions(), 1);
    assert_eq!(pipeline.buffer.size(), 30);
    assert_eq!(pipeline.logs.all().len(), 40);
}

#[tokio::test]
async fn test_worker_that_lost_its_lease_records_nothing() {
    let pipeline = Pipeline::new(ScriptedLookup::new(), FailurePolicy::Complete);
    let batch = pipeline.submit(&["A"]).await;
    let other_worker = Uuid::new_v4();
    let worker = pipeline.worker_with(Arc::new(LeaseExpiringLookup {
        queue: pipeline.queue.clone(),
        record: product("A"),
        other_worker,
    }));

    let outcome = worker.process_next().await.unwrap().unwrap();

    assert_eq!(outcome, UnitOutcome::LeaseLost);
    assert!(pipeline.logs.all().is_empty());
    assert_eq!(pipeline.buffer.size(), 0);
    let batch = pipeline.batches.get(batch.id).unwrap();
    assert_eq!(batch.processed_units(), 0);
    assert_eq!(batch.status, BatchStatus::InProgress);

    // The unit stays with the worker that claimed it second
    assert_eq!(pipeline.queue.count_with_status(UnitStatus::Active), 1);
    let units = pipeline.queue.units_of(batch.id);
    assert_eq!(units[0].lock_token, Some(other_worker));
    assert_eq!(units[0].attempt_count, 2);
}
