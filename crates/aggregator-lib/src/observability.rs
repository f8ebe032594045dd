//! Observability infrastructure for the health aggregator
//!
//! Provides:
//! - Prometheus gauges projected from each aggregate report
//! - Structured logging of transitions and remediation outcomes with tracing

use crate::health::{AggregateReport, HealthStatus};
use anyhow::Result;
use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};
use tracing::{error, info, warn};

/// Health gauges held in an owned registry
///
/// Clones share the same underlying gauges and registry.
#[derive(Clone)]
pub struct HealthMetrics {
    registry: Registry,
    service_status: GaugeVec,
    service_latency_ms: GaugeVec,
    platform_status: Gauge,
}

impl HealthMetrics {
    /// Create the gauge set and register it in a fresh registry
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let service_status = GaugeVec::new(
            Opts::new(
                "service_health_status",
                "Health status of a platform service (1=healthy, 0=unhealthy)",
            ),
            &["service"],
        )?;
        registry.register(Box::new(service_status.clone()))?;

        let service_latency_ms = GaugeVec::new(
            Opts::new(
                "service_health_latency_ms",
                "Health check latency in milliseconds",
            ),
            &["service"],
        )?;
        registry.register(Box::new(service_latency_ms.clone()))?;

        let platform_status = Gauge::new(
            "platform_health_status",
            "Overall platform health status (1=healthy, 0.5=degraded, 0=unhealthy)",
        )?;
        registry.register(Box::new(platform_status.clone()))?;

        Ok(Self {
            registry,
            service_status,
            service_latency_ms,
            platform_status,
        })
    }

    /// Project a report onto the gauges.
    ///
    /// Latency is only written when the report carries a value; an absent
    /// latency leaves the previous value in place.
    pub fn update(&self, report: &AggregateReport) {
        self.platform_status.set(report.status.gauge_value());

        for (service, result) in &report.services {
            let healthy = if result.status.is_healthy() { 1.0 } else { 0.0 };
            self.service_status
                .with_label_values(&[service.as_str()])
                .set(healthy);

            if let Some(latency) = result.latency_ms {
                self.service_latency_ms
                    .with_label_values(&[service.as_str()])
                    .set(latency);
            }
        }
    }

    pub fn service_status(&self, service: &str) -> f64 {
        self.service_status.with_label_values(&[service]).get()
    }

    pub fn service_latency_ms(&self, service: &str) -> f64 {
        self.service_latency_ms.with_label_values(&[service]).get()
    }

    pub fn platform_status(&self) -> f64 {
        self.platform_status.get()
    }

    /// Render all gauges in the Prometheus text exposition format
    pub fn render(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(buffer)
    }

    /// Content type of [`HealthMetrics::render`] output
    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}

/// Structured logger for aggregator events
///
/// Routine healthy cycles log nothing; only status changes, outage
/// reminders and remediation outcomes are emitted.
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    pub fn log_service_down(&self, service: &str, error: &str) {
        warn!(
            event = "service_down",
            instance = %self.instance,
            service = %service,
            error = %error,
            "Service is now unhealthy"
        );
    }

    pub fn log_service_recovered(&self, service: &str) {
        info!(
            event = "service_recovered",
            instance = %self.instance,
            service = %service,
            "Service is now healthy"
        );
    }

    pub fn log_service_still_down(&self, service: &str, error: &str) {
        warn!(
            event = "service_still_down",
            instance = %self.instance,
            service = %service,
            error = %error,
            "Service is still unhealthy"
        );
    }

    pub fn log_platform_transition(&self, from: HealthStatus, to: HealthStatus) {
        match to {
            HealthStatus::Unhealthy => error!(
                event = "platform_transition",
                instance = %self.instance,
                from = %from,
                to = %to,
                "Platform unhealthy: multiple services down"
            ),
            HealthStatus::Degraded => warn!(
                event = "platform_transition",
                instance = %self.instance,
                from = %from,
                to = %to,
                "Platform degraded: some services unavailable"
            ),
            HealthStatus::Healthy => info!(
                event = "platform_transition",
                instance = %self.instance,
                from = %from,
                to = %to,
                "Platform healthy: all services operational"
            ),
        }
    }

    pub fn log_restart_attempt(&self, service: &str, attempt: usize, max_attempts: usize) {
        warn!(
            event = "restart_attempt",
            instance = %self.instance,
            service = %service,
            attempt = attempt,
            max_attempts = max_attempts,
            "Restarting service"
        );
    }

    pub fn log_restart_rate_limited(&self, service: &str, max_attempts: usize) {
        warn!(
            event = "restart_rate_limited",
            instance = %self.instance,
            service = %service,
            max_attempts = max_attempts,
            "Restart rate limited, attempt budget for the window is spent"
        );
    }

    pub fn log_restart_initiated(&self, service: &str) {
        info!(
            event = "restart_initiated",
            instance = %self.instance,
            service = %service,
            "Restart command launched"
        );
    }

    pub fn log_restart_failed(&self, service: &str, reason: &str) {
        error!(
            event = "restart_failed",
            instance = %self.instance,
            service = %service,
            reason = %reason,
            "Restart could not be launched"
        );
    }

    /// Log aggregator startup
    pub fn log_startup(&self, version: &str, services: usize) {
        info!(
            event = "aggregator_started",
            instance = %self.instance,
            version = %version,
            services = services,
            "Health aggregator started"
        );
    }

    /// Log aggregator shutdown
    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "aggregator_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Health aggregator shutting down"
        );
    }
}
