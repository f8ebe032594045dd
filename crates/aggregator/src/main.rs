//! Health Aggregator - platform health polling and auto-remediation
//!
//! This binary polls every configured service, serves the aggregate report
//! and Prometheus gauges over HTTP, and restarts services that go down.

use aggregator_lib::{
    collector::MetricsCollectorLoopBuilder,
    remediation::{RestartRateLimiter, ShellRestarter, TopologyLoader},
    HealthAggregator, HealthMetrics, HttpProber, StructuredLogger,
};
use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const AGGREGATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting health-aggregator");

    // Load configuration
    let config = config::AggregatorConfig::load()?;
    info!(
        instance = %config.instance_name,
        services = config.services.len(),
        topology = %config.topology_path.display(),
        "Aggregator configured"
    );

    let logger = StructuredLogger::new(&config.instance_name);

    // Build the aggregator and its collaborators
    let prober = Arc::new(HttpProber::new(config.probe_timeout())?);
    let restarter = Arc::new(ShellRestarter::new(
        TopologyLoader::new(&config.topology_path),
        &config.platform_root,
        config.service_aliases.clone(),
    ));
    let aggregator = Arc::new(
        HealthAggregator::new(config.endpoints(), prober, restarter)
            .with_rate_limiter(RestartRateLimiter::new(
                config.max_restart_attempts,
                config.restart_window(),
            ))
            .with_logger(logger.clone()),
    );

    // Initialize metrics
    let metrics = HealthMetrics::new()?;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start the background collector
    let collector_handle = if config.collector_enabled {
        let collector = MetricsCollectorLoopBuilder::new()
            .aggregator(aggregator.clone())
            .metrics(metrics.clone())
            .interval(config.collection_interval())
            .build()?;
        Some(collector.spawn(shutdown_tx.subscribe()))
    } else {
        None
    };

    // Start health and metrics server
    let app_state = Arc::new(api::AppState::new(aggregator.clone(), metrics));
    let mut api_handle = tokio::spawn(api::serve(
        config.api_port,
        app_state,
        shutdown_tx.subscribe(),
    ));

    logger.log_startup(AGGREGATOR_VERSION, aggregator.services().len());

    // Wait for shutdown signal, or the server exiting on its own
    let server_result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
            None
        }
        result = &mut api_handle => Some(result),
    };

    let _ = shutdown_tx.send(());

    if let Some(handle) = collector_handle {
        handle.await?;
    }

    match server_result {
        Some(result) => result??,
        None => api_handle.await??,
    }

    info!("Shutdown complete");
    Ok(())
}
