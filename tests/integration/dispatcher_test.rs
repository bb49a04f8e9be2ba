// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::{InMemoryBatchRepository, InMemoryCrawlLogRepository, InMemoryWorkQueue};
use mpncrawl::application::dto::batch_request::CreateBatchRequest;
use mpncrawl::application::use_cases::batch_use_case::{BatchUseCase, BatchUseCaseError};
use mpncrawl::config::settings::BatchSettings;
use mpncrawl::domain::models::batch::{BatchStatus, FailurePolicy};
use mpncrawl::domain::models::crawl_unit::{UnitPayload, UnitStatus};
use mpncrawl::domain::repositories::batch_repository::BatchRepository;
use mpncrawl::queue::work_queue::WorkQueue;
use std::sync::Arc;

fn dispatcher(
    queue: Arc<InMemoryWorkQueue>,
    batches: Arc<InMemoryBatchRepository>,
) -> BatchUseCase {
    let queue: Arc<dyn WorkQueue> = queue;
    let batches: Arc<dyn BatchRepository> = batches;
    BatchUseCase::new(
        batches,
        queue,
        Arc::new(InMemoryCrawlLogRepository::new()),
        BatchSettings {
            default_region: "USD".to_string(),
            max_identifiers: 5,
            failure_policy: FailurePolicy::Complete,
        },
        3,
    )
}

fn request(identifiers: &[&str]) -> CreateBatchRequest {
    CreateBatchRequest {
        identifiers: identifiers.iter().map(|s| s.to_string()).collect(),
        region: None,
        request_name: None,
        file_name: Some("parts.csv".to_string()),
    }
}

#[tokio::test]
async fn test_create_batch_enqueues_one_unit_per_identifier() {
    let queue = Arc::new(InMemoryWorkQueue::new());
    let batches = Arc::new(InMemoryBatchRepository::default());
    let use_case = dispatcher(queue.clone(), batches.clone());

    let batch = use_case
        .create_batch(request(&[" LM358 ", "", "NE555", "   "]))
        .await
        .unwrap();

    assert_eq!(batch.total_units, 2);
    assert_eq!(batch.region, "USD");
    assert_eq!(batch.status, BatchStatus::Pending);
    assert_eq!(batch.file_name.as_deref(), Some("parts.csv"));
    assert_eq!(queue.count_with_status(UnitStatus::Queued), 2);

    let claimed = queue.claim(uuid::Uuid::new_v4()).await.unwrap().unwrap();
    assert_eq!(claimed.batch_id, batch.id);
    assert_eq!(claimed.max_attempts, 3);
    assert_eq!(
        claimed.decode_payload().unwrap(),
        UnitPayload::CrawlMpn {
            mpn: "LM358".to_string(),
            region: "USD".to_string(),
        }
    );

    assert_eq!(use_case.get_batch_status(batch.id).await.unwrap(), batch);
}

#[tokio::test]
async fn test_explicit_region_overrides_default() {
    let queue = Arc::new(InMemoryWorkQueue::new());
    let use_case = dispatcher(queue.clone(), Arc::new(InMemoryBatchRepository::default()));

    let mut req = request(&["LM358"]);
    req.region = Some("EUR".to_string());
    let batch = use_case.create_batch(req).await.unwrap();

    assert_eq!(batch.region, "EUR");
    let unit = queue.claim(uuid::Uuid::new_v4()).await.unwrap().unwrap();
    assert_eq!(unit.decode_payload().unwrap().region(), "EUR");
}

#[tokio::test]
async fn test_blank_identifiers_are_rejected_before_queueing() {
    let queue = Arc::new(InMemoryWorkQueue::new());
    let batches = Arc::new(InMemoryBatchRepository::default());
    let use_case = dispatcher(queue.clone(), batches.clone());

    for identifiers in [vec![], vec!["  ", ""]] {
        let result = use_case.create_batch(request(&identifiers)).await;
        assert!(matches!(result, Err(BatchUseCaseError::Validation(_))));
    }

    assert_eq!(queue.len(), 0);
    assert!(batches.all().is_empty());
}

#[tokio::test]
async fn test_too_many_identifiers_are_rejected() {
    let queue = Arc::new(InMemoryWorkQueue::new());
    let batches = Arc::new(InMemoryBatchRepository::default());
    let use_case = dispatcher(queue.clone(), batches.clone());

    let result = use_case
        .create_batch(request(&["A", "B", "C", "D", "E", "F"]))
        .await;

    assert!(matches!(result, Err(BatchUseCaseError::Validation(_))));
    assert!(batches.all().is_empty());
}

#[tokio::test]
async fn test_partial_enqueue_fails_batch_and_cancels_accepted_units() {
    let queue = Arc::new(InMemoryWorkQueue::accepting_at_most(2));
    let batches = Arc::new(InMemoryBatchRepository::default());
    let use_case = dispatcher(queue.clone(), batches.clone());

    let err = use_case
        .create_batch(request(&["A", "B", "C", "D"]))
        .await
        .unwrap_err();

    let batch_id = match err {
        BatchUseCaseError::PartialEnqueue {
            batch_id,
            accepted,
            requested,
        } => {
            assert_eq!(accepted, 2);
            assert_eq!(requested, 4);
            batch_id
        }
        other => panic!("unexpected error: {:?}", other),
    };

    let batch = batches.get(batch_id).unwrap();
    assert_eq!(batch.status, BatchStatus::Failed);
    assert!(batch.completed_at.is_some());
    assert_eq!(queue.count_with_status(UnitStatus::Queued), 0);
    assert_eq!(queue.count_with_status(UnitStatus::Cancelled), 2);
}

#[tokio::test]
async fn test_enqueue_error_fails_batch() {
    let queue = Arc::new(InMemoryWorkQueue::failing_enqueue());
    let batches = Arc::new(InMemoryBatchRepository::default());
    let use_case = dispatcher(queue, batches.clone());

    let err = use_case.create_batch(request(&["A"])).await.unwrap_err();

    assert!(matches!(err, BatchUseCaseError::EnqueueFailed { .. }));
    let batch_id = err.batch_id().unwrap();
    assert_eq!(batches.get(batch_id).unwrap().status, BatchStatus::Failed);
}

#[tokio::test]
async fn test_unknown_batch_is_not_found() {
    let use_case = dispatcher(
        Arc::new(InMemoryWorkQueue::new()),
        Arc::new(InMemoryBatchRepository::default()),
    );

    let result = use_case.get_batch_status(uuid::Uuid::new_v4()).await;
    assert!(matches!(result, Err(BatchUseCaseError::NotFound)));
}

#[tokio::test(start_paused = true)]
async fn test_failed_batch_marking_is_retried() {
    let queue = Arc::new(InMemoryWorkQueue::failing_enqueue());
    let batches = Arc::new(InMemoryBatchRepository::default());
    batches.fail_next_mark_failed(2);
    let use_case = dispatcher(queue, batches.clone());

    let err = use_case.create_batch(request(&["A", "B"])).await.unwrap_err();

    assert!(matches!(err, BatchUseCaseError::EnqueueFailed { .. }));
    let batch_id = err.batch_id().unwrap();
    assert_eq!(batches.get(batch_id).unwrap().status, BatchStatus::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_unmarkable_batch_surfaces_the_storage_error() {
    let queue = Arc::new(InMemoryWorkQueue::accepting_at_most(1));
    let batches = Arc::new(InMemoryBatchRepository::default());
    batches.fail_next_mark_failed(10);
    let use_case = dispatcher(queue.clone(), batches.clone());

    let err = use_case
        .create_batch(request(&["A", "B", "C"]))
        .await
        .unwrap_err();

    let batch_id = match &err {
        BatchUseCaseError::AbortFailed {
            batch_id, reason, ..
        } => {
            assert!(reason.contains("1 of 3"), "reason: {}", reason);
            *batch_id
        }
        other => panic!("unexpected error: {:?}", other),
    };
    assert_eq!(err.batch_id(), Some(batch_id));
    assert!(err.to_string().contains("connection reset"));
    assert_eq!(batches.get(batch_id).unwrap().status, BatchStatus::Pending);
    // queued units are still cancelled
    assert_eq!(queue.count_with_status(UnitStatus::Cancelled), 1);
}
