//! Metrics collection
//!
//! Pairs an aggregation cycle with a gauge update, either on demand (a
//! scrape) or on a fixed interval in the background.

mod r#loop;

pub use r#loop::{CollectorConfig, MetricsCollectorLoop, MetricsCollectorLoopBuilder};

use crate::aggregator::HealthAggregator;
use crate::health::AggregateReport;
use crate::observability::HealthMetrics;

/// Run a fresh aggregation cycle and project it onto the gauges
pub async fn collect_metrics(
    aggregator: &HealthAggregator,
    metrics: &HealthMetrics,
) -> AggregateReport {
    let report = aggregator.check_all().await;
    metrics.update(&report);
    report
}
