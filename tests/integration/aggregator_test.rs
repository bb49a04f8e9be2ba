// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::{
    envelope, InMemoryCrawlLogRepository, InMemoryProductRepository, InMemoryResultBuffer,
};
use chrono::Utc;
use mpncrawl::domain::models::crawl_log::{CrawlLog, CrawlLogStatus};
use mpncrawl::domain::repositories::crawl_log_repository::CrawlLogRepository;
use mpncrawl::domain::repositories::product_repository::ProductRepository;
use mpncrawl::queue::result_buffer::ResultBuffer;
use mpncrawl::workers::aggregator_worker::{AggregatorConfig, AggregatorError, BatchAggregator};
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    buffer: Arc<InMemoryResultBuffer>,
    products: Arc<InMemoryProductRepository>,
    logs: Arc<InMemoryCrawlLogRepository>,
    aggregator: BatchAggregator<InMemoryResultBuffer>,
}

fn fixture(batch_size: usize, max_consecutive_failures: u32) -> Fixture {
    let buffer = Arc::new(InMemoryResultBuffer::new());
    let products = Arc::new(InMemoryProductRepository::new());
    let logs = Arc::new(InMemoryCrawlLogRepository::new());
    let product_repo: Arc<dyn ProductRepository> = products.clone();
    let log_repo: Arc<dyn CrawlLogRepository> = logs.clone();
    let aggregator = BatchAggregator::new(
        buffer.clone(),
        product_repo,
        log_repo,
        AggregatorConfig {
            interval: Duration::from_secs(30),
            batch_size,
            max_consecutive_failures,
        },
    );
    Fixture {
        buffer,
        products,
        logs,
        aggregator,
    }
}

#[tokio::test]
async fn test_empty_buffer_tick_writes_nothing() {
    let f = fixture(200, 10);

    let report = f.aggregator.tick().await.unwrap();

    assert_eq!(report.drained, 0);
    assert_eq!(f.products.insert_calls(), 0);
}

#[tokio::test]
async fn test_failed_write_keeps_entries_for_next_tick() {
    let f = fixture(200, 10);
    for i in 0..50 {
        f.buffer.push(&envelope(&format!("PART-{}", i))).await.unwrap();
    }
    f.products.fail_next_inserts(1);

    let err = f.aggregator.tick().await.unwrap_err();
    assert!(matches!(err, AggregatorError::Storage(_)));
    assert_eq!(f.buffer.size(), 50);
    assert_eq!(f.products.product_count(), 0);
    assert_eq!(f.aggregator.consecutive_failures(), 1);

    let report = f.aggregator.tick().await.unwrap();
    assert_eq!(report.drained, 50);
    assert_eq!(report.products, 50);
    assert_eq!(report.distributors, 100);
    assert_eq!(f.buffer.size(), 0);
    assert_eq!(f.products.product_count(), 50);
    assert_eq!(f.products.distributor_count(), 100);
    assert_eq!(f.aggregator.consecutive_failures(), 0);

    let report = f.aggregator.tick().await.unwrap();
    assert_eq!(report.drained, 0);
    assert_eq!(f.products.product_count(), 50);
}

#[tokio::test]
async fn test_tick_drains_at_most_batch_size() {
    let f = fixture(20, 10);
    for i in 0..45 {
        f.buffer.push(&envelope(&format!("PART-{}", i))).await.unwrap();
    }

    assert_eq!(f.aggregator.tick().await.unwrap().drained, 20);
    assert_eq!(f.aggregator.tick().await.unwrap().drained, 20);
    assert_eq!(f.aggregator.tick().await.unwrap().drained, 5);
    assert_eq!(f.buffer.size(), 0);
    assert_eq!(f.products.product_count(), 45);
}

#[tokio::test]
async fn test_malformed_entries_are_skipped_and_removed() {
    let f = fixture(200, 10);
    f.buffer.push(&envelope("LM358")).await.unwrap();
    f.buffer.push_raw("{not json");
    f.buffer.push(&envelope("NE555")).await.unwrap();

    let report = f.aggregator.tick().await.unwrap();

    assert_eq!(report.drained, 3);
    assert_eq!(report.malformed, 1);
    assert_eq!(report.products, 2);
    assert_eq!(f.buffer.size(), 0);
}

#[tokio::test]
async fn test_products_are_back_linked_to_crawl_logs() {
    let f = fixture(200, 10);
    let linked = envelope("LM358");
    let orphan = envelope("NE555");
    let now = Utc::now();
    f.logs
        .create(&CrawlLog::new(
            linked.crawl_id,
            linked.batch_id,
            "LM358",
            CrawlLogStatus::Success,
            now,
            now,
            1,
        ))
        .await
        .unwrap();
    f.buffer.push(&linked).await.unwrap();
    f.buffer.push(&orphan).await.unwrap();

    let report = f.aggregator.tick().await.unwrap();

    assert_eq!(report.products, 2);
    assert_eq!(f.buffer.size(), 0);
    let log = &f.logs.all()[0];
    assert_eq!(log.product_id, f.products.product_for(linked.crawl_id));
    assert!(log.product_id.is_some());
}

#[tokio::test]
async fn test_replayed_entries_are_written_once() {
    let f = fixture(200, 10);
    let entry = envelope("LM358");
    f.buffer.push(&entry).await.unwrap();
    f.aggregator.tick().await.unwrap();

    f.buffer.push(&entry).await.unwrap();
    let report = f.aggregator.tick().await.unwrap();

    assert_eq!(report.distributors, 0);
    assert_eq!(f.products.product_count(), 1);
    assert_eq!(f.products.distributor_count(), 2);
}

#[tokio::test]
async fn test_consecutive_failures_reach_alert_threshold() {
    let f = fixture(200, 3);
    f.buffer.push(&envelope("LM358")).await.unwrap();
    f.products.fail_next_inserts(4);

    for expected in 1..=4 {
        assert!(f.aggregator.tick().await.is_err());
        assert_eq!(f.aggregator.consecutive_failures(), expected);
    }
    assert_eq!(f.buffer.size(), 1);

    f.aggregator.tick().await.unwrap();
    assert_eq!(f.aggregator.consecutive_failures(), 0);
    assert_eq!(f.buffer.size(), 0);
}
