//! Metrics collection loop
//!
//! Periodically runs an aggregation cycle and projects the report onto the
//! health gauges. The loop is stopped through a shutdown broadcast and is
//! meant to be joined, not abandoned.

use super::collect_metrics;
use crate::aggregator::HealthAggregator;
use crate::observability::HealthMetrics;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

/// Configuration for the metrics collection loop
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Time between aggregation cycles (default: 30 seconds)
    pub interval: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

/// Background loop that keeps the health gauges fresh
pub struct MetricsCollectorLoop {
    aggregator: Arc<HealthAggregator>,
    metrics: HealthMetrics,
    config: CollectorConfig,
}

impl MetricsCollectorLoop {
    pub fn new(
        aggregator: Arc<HealthAggregator>,
        metrics: HealthMetrics,
        config: CollectorConfig,
    ) -> Self {
        Self {
            aggregator,
            metrics,
            config,
        }
    }

    /// Run until a shutdown message arrives.
    ///
    /// A cycle that has started always finishes its gauge update before the
    /// shutdown branch is polled again.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            services = self.aggregator.services().len(),
            "Starting metrics collection loop"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0u64;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let start = Instant::now();
                    let report = collect_metrics(&self.aggregator, &self.metrics).await;
                    cycles += 1;

                    debug!(
                        cycle = cycles,
                        status = %report.status,
                        unhealthy = report.unhealthy_count(),
                        elapsed_ms = start.elapsed().as_millis(),
                        "Collection cycle complete"
                    );
                }
                _ = shutdown.recv() => {
                    info!(cycles, "Shutting down metrics collection loop");
                    break;
                }
            }
        }
    }

    /// Spawn the loop onto the runtime; join the handle on shutdown
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

/// Builder for creating the collection loop
pub struct MetricsCollectorLoopBuilder {
    aggregator: Option<Arc<HealthAggregator>>,
    metrics: Option<HealthMetrics>,
    config: CollectorConfig,
}

impl MetricsCollectorLoopBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            aggregator: None,
            metrics: None,
            config: CollectorConfig::default(),
        }
    }

    pub fn aggregator(mut self, aggregator: Arc<HealthAggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    pub fn metrics(mut self, metrics: HealthMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Set the collection interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    pub fn build(self) -> Result<MetricsCollectorLoop> {
        let aggregator = self
            .aggregator
            .ok_or_else(|| anyhow::anyhow!("Aggregator is required"))?;
        let metrics = self
            .metrics
            .ok_or_else(|| anyhow::anyhow!("Metrics are required"))?;

        if self.config.interval.is_zero() {
            anyhow::bail!("Collection interval must be non-zero");
        }

        Ok(MetricsCollectorLoop::new(aggregator, metrics, self.config))
    }
}

impl Default for MetricsCollectorLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}
