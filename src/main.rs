// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use mpncrawl::application::use_cases::batch_use_case::BatchUseCase;
use mpncrawl::config::settings::Settings;
use mpncrawl::domain::repositories::batch_repository::BatchRepository;
use mpncrawl::domain::repositories::crawl_log_repository::CrawlLogRepository;
use mpncrawl::domain::repositories::product_repository::ProductRepository;
use mpncrawl::domain::services::part_lookup::PartLookup;
use mpncrawl::infrastructure::cache::redis_client::RedisClient;
use mpncrawl::infrastructure::database::connection;
use mpncrawl::infrastructure::lookup::http_lookup::HttpPartLookup;
use mpncrawl::infrastructure::metrics;
use mpncrawl::infrastructure::repositories::batch_repo_impl::BatchRepositoryImpl;
use mpncrawl::infrastructure::repositories::crawl_log_repo_impl::CrawlLogRepositoryImpl;
use mpncrawl::infrastructure::repositories::crawl_unit_repo_impl::CrawlUnitRepositoryImpl;
use mpncrawl::infrastructure::repositories::product_repo_impl::ProductRepositoryImpl;
use mpncrawl::presentation::routes;
use mpncrawl::queue::result_buffer::RedisResultBuffer;
use mpncrawl::queue::work_queue::{PostgresWorkQueue, WorkQueue};
use mpncrawl::utils::telemetry;
use mpncrawl::workers::aggregator_worker::AggregatorConfig;
use mpncrawl::workers::crawl_worker::CrawlWorkerConfig;
use mpncrawl::workers::manager::WorkerManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting mpncrawl...");

    // 2. Load configuration
    let settings = Settings::new()?;
    info!("Configuration loaded");

    metrics::init_metrics(&settings.metrics);

    // 3. Connect to database and apply migrations
    let db = connection::connect_and_migrate(&settings.database).await?;
    info!("Database connection established");

    // 4. Result buffer
    let redis_client = RedisClient::new(&settings.redis.url).await?;
    redis_client.ping().await?;
    let buffer = Arc::new(RedisResultBuffer::new(
        redis_client,
        settings.redis.result_buffer_key.clone(),
    ));
    info!("Redis result buffer initialized");

    // 5. Repositories and work queue
    let unit_repo = Arc::new(CrawlUnitRepositoryImpl::new(db.clone()));
    let batches: Arc<dyn BatchRepository> = Arc::new(BatchRepositoryImpl::new(
        db.clone(),
        settings.batch.failure_policy,
    ));
    let logs: Arc<dyn CrawlLogRepository> = Arc::new(CrawlLogRepositoryImpl::new(db.clone()));
    let products: Arc<dyn ProductRepository> = Arc::new(ProductRepositoryImpl::new(db.clone()));

    let queue = Arc::new(PostgresWorkQueue::new(
        unit_repo,
        settings.queue.retry_policy(),
        chrono::Duration::seconds(settings.worker.lease_secs),
        settings.queue.enqueue_chunk_size,
    ));

    let lookup_timeout = Duration::from_secs(settings.worker.lookup_timeout_secs);
    let lookup: Arc<dyn PartLookup> = Arc::new(HttpPartLookup::new(&settings.lookup, lookup_timeout)?);

    // 6. Start workers
    let mut worker_manager = WorkerManager::new(
        queue.clone(),
        buffer,
        batches.clone(),
        logs.clone(),
        products,
        lookup,
    );
    worker_manager.start_workers(
        settings.worker.concurrency,
        CrawlWorkerConfig {
            poll_interval: Duration::from_millis(settings.worker.poll_interval_ms),
            lookup_timeout,
        },
    );
    worker_manager.start_aggregator(AggregatorConfig {
        interval: Duration::from_secs(settings.aggregator.interval_secs),
        batch_size: settings.aggregator.batch_size,
        max_consecutive_failures: settings.aggregator.max_consecutive_failures,
    });
    worker_manager.start_maintenance(Duration::from_secs(
        settings.queue.maintenance_interval_secs,
    ));

    // 7. Start HTTP server
    let work_queue: Arc<dyn WorkQueue> = queue;
    let use_case = Arc::new(BatchUseCase::new(
        batches,
        work_queue,
        logs,
        settings.batch.clone(),
        settings.queue.max_attempts,
    ));
    let app = routes::routes(use_case);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    worker_manager.shutdown();

    Ok(())
}

/// 等待 Ctrl-C
async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(err) => error!("Unable to listen for shutdown signal: {}", err),
    }
}
