// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::MetricsSettings;
use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

pub const CRAWL_UNITS_TOTAL: &str = "crawl_units_total";
pub const CRAWL_LOOKUP_DURATION_SECONDS: &str = "crawl_lookup_duration_seconds";
pub const AGGREGATOR_ROWS_WRITTEN_TOTAL: &str = "aggregator_rows_written_total";
pub const AGGREGATOR_STORAGE_FAILURES_TOTAL: &str = "aggregator_storage_failures_total";
pub const AGGREGATOR_STORAGE_ALERTS_TOTAL: &str = "aggregator_storage_alerts_total";
pub const BATCHES_CREATED_TOTAL: &str = "batches_created_total";
pub const BATCHES_FINALIZED_TOTAL: &str = "batches_finalized_total";

pub fn init_metrics(settings: &MetricsSettings) {
    if !settings.enabled {
        return;
    }

    let addr: SocketAddr = match settings.address.parse() {
        Ok(addr) => addr,
        Err(e) => {
            warn!("Invalid metrics address {}: {}", settings.address, e);
            return;
        }
    };

    if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
        warn!("Failed to install Prometheus recorder: {}", e);
        return;
    }

    describe_metrics();
    info!("Metrics exporter listening on {}", addr);
}

fn describe_metrics() {
    describe_counter!(CRAWL_UNITS_TOTAL, "Crawl units processed, by outcome");
    describe_histogram!(
        CRAWL_LOOKUP_DURATION_SECONDS,
        Unit::Seconds,
        "Duration of part lookups"
    );
    describe_counter!(
        AGGREGATOR_ROWS_WRITTEN_TOTAL,
        "Product and distributor rows written by the aggregator"
    );
    describe_counter!(
        AGGREGATOR_STORAGE_FAILURES_TOTAL,
        "Aggregator ticks that failed to write"
    );
    describe_counter!(
        AGGREGATOR_STORAGE_ALERTS_TOTAL,
        "Aggregator alerts raised after consecutive storage failures"
    );
    describe_counter!(BATCHES_CREATED_TOTAL, "Batches accepted by the dispatcher");
    describe_counter!(BATCHES_FINALIZED_TOTAL, "Batches finalized, by status");
}
