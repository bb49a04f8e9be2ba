// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use mpncrawl::config::settings::Settings;
use mpncrawl::infrastructure::cache::redis_client::RedisClient;
use mpncrawl::infrastructure::database::connection;
use mpncrawl::infrastructure::repositories::crawl_unit_repo_impl::CrawlUnitRepositoryImpl;
use mpncrawl::queue::result_buffer::{RedisResultBuffer, ResultBuffer};
use mpncrawl::queue::work_queue::{PostgresWorkQueue, WorkQueue};
use mpncrawl::utils::telemetry;
use std::sync::Arc;
use tracing::info;

/// 清空工作队列中的全部单元和结果缓冲
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_telemetry();

    let settings = Settings::new()?;
    let db = connection::connect_and_migrate(&settings.database).await?;

    let queue = PostgresWorkQueue::new(
        Arc::new(CrawlUnitRepositoryImpl::new(db)),
        settings.queue.retry_policy(),
        chrono::Duration::seconds(settings.worker.lease_secs),
        settings.queue.enqueue_chunk_size,
    );
    let purged_units = queue.purge().await?;
    info!("Purged {} crawl units", purged_units);

    let redis_client = RedisClient::new(&settings.redis.url).await?;
    let buffer = RedisResultBuffer::new(redis_client, settings.redis.result_buffer_key.clone());
    let pending = buffer.len().await?;
    buffer.purge().await?;
    info!("Purged result buffer ({} entries)", pending);

    Ok(())
}
