//! Health status types for downstream services and the platform
//!
//! Provides the per-service probe result, the aggregate platform report,
//! and the fixed-threshold policy that derives one from the other.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Number of unhealthy services the platform tolerates while still degraded.
///
/// This is an absolute count, not a fraction of the configured set.
pub const DEGRADED_MAX_UNHEALTHY: usize = 2;

/// Health status of a single downstream service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// Health endpoint answered 200
    Healthy,
    /// Probe failed for any reason
    Unhealthy,
}

impl ServiceStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ServiceStatus::Healthy)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::Healthy => write!(f, "healthy"),
            ServiceStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Aggregate health status of the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every service is healthy
    Healthy,
    /// Some services are down but the platform is still operational
    Degraded,
    /// Too many services are down
    Unhealthy,
}

impl HealthStatus {
    /// Returns true if the platform is at least partially operational
    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }

    /// Gauge value exported for this status
    pub fn gauge_value(&self) -> f64 {
        match self {
            HealthStatus::Healthy => 1.0,
            HealthStatus::Degraded => 0.5,
            HealthStatus::Unhealthy => 0.0,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Outcome of one probe against one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub status: ServiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    pub fn healthy(latency_ms: f64) -> Self {
        Self {
            status: ServiceStatus::Healthy,
            latency_ms: Some(latency_ms),
            error: None,
        }
    }

    pub fn unhealthy(error: impl Into<String>, latency_ms: Option<f64>) -> Self {
        Self {
            status: ServiceStatus::Unhealthy,
            latency_ms,
            error: Some(error.into()),
        }
    }

    /// Error text used in log events, falling back when none was recorded
    pub fn error_or_unknown(&self) -> &str {
        self.error.as_deref().unwrap_or("unknown error")
    }
}

/// Aggregate platform health report for one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub status: HealthStatus,
    /// RFC3339 UTC instant with a literal `Z` suffix
    pub timestamp: String,
    pub services: BTreeMap<String, ProbeResult>,
}

impl AggregateReport {
    /// Build a report stamped with the current UTC time
    pub fn new(services: BTreeMap<String, ProbeResult>) -> Self {
        let status = aggregate_status(
            services
                .values()
                .filter(|r| r.status == ServiceStatus::Unhealthy)
                .count(),
        );

        Self {
            status,
            timestamp: utc_timestamp(),
            services,
        }
    }

    pub fn unhealthy_count(&self) -> usize {
        self.services
            .values()
            .filter(|r| r.status == ServiceStatus::Unhealthy)
            .count()
    }
}

/// Compute platform status from the number of unhealthy services
pub fn aggregate_status(unhealthy_count: usize) -> HealthStatus {
    match unhealthy_count {
        0 => HealthStatus::Healthy,
        n if n <= DEGRADED_MAX_UNHEALTHY => HealthStatus::Degraded,
        _ => HealthStatus::Unhealthy,
    }
}

/// Current UTC instant as RFC3339 with a `Z` suffix
pub fn utc_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn services(statuses: &[ServiceStatus]) -> BTreeMap<String, ProbeResult> {
        statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                let result = match status {
                    ServiceStatus::Healthy => ProbeResult::healthy(1.0),
                    ServiceStatus::Unhealthy => ProbeResult::unhealthy("timeout", Some(5000.0)),
                };
                (format!("svc-{}", i), result)
            })
            .collect()
    }

    #[test]
    fn test_aggregate_status_thresholds() {
        assert_eq!(aggregate_status(0), HealthStatus::Healthy);
        assert_eq!(aggregate_status(1), HealthStatus::Degraded);
        assert_eq!(aggregate_status(2), HealthStatus::Degraded);
        assert_eq!(aggregate_status(3), HealthStatus::Unhealthy);
        assert_eq!(aggregate_status(50), HealthStatus::Unhealthy);
    }

    #[test]
    fn test_threshold_is_absolute_not_percentage() {
        use ServiceStatus::*;

        // 3 of 6 is exactly half, still unhealthy
        let report = AggregateReport::new(services(&[
            Unhealthy, Unhealthy, Unhealthy, Healthy, Healthy, Healthy,
        ]));
        assert_eq!(report.status, HealthStatus::Unhealthy);

        // 2 of 2 is everything down, but only degraded
        let report = AggregateReport::new(services(&[Unhealthy, Unhealthy]));
        assert_eq!(report.status, HealthStatus::Degraded);

        // 3 of 20 is a small minority, still unhealthy
        let mut statuses = vec![Healthy; 17];
        statuses.extend([Unhealthy, Unhealthy, Unhealthy]);
        let report = AggregateReport::new(services(&statuses));
        assert_eq!(report.status, HealthStatus::Unhealthy);
    }

    #[test]
    fn test_empty_service_set_is_healthy() {
        let report = AggregateReport::new(BTreeMap::new());
        assert_eq!(report.status, HealthStatus::Healthy);
        assert_eq!(report.unhealthy_count(), 0);
    }

    #[test]
    fn test_timestamp_has_z_suffix() {
        let ts = utc_timestamp();
        assert!(ts.ends_with('Z'), "timestamp should end with Z: {}", ts);
        assert!(!ts.contains("+00:00"));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }

    #[test]
    fn test_report_serialization_omits_absent_fields() {
        let mut services = BTreeMap::new();
        services.insert("a".to_string(), ProbeResult::unhealthy("timeout", None));
        services.insert("b".to_string(), ProbeResult::healthy(12.3));
        let report = AggregateReport::new(services);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["services"]["a"]["status"], "unhealthy");
        assert_eq!(json["services"]["a"]["error"], "timeout");
        assert!(json["services"]["a"].get("latency_ms").is_none());
        assert_eq!(json["services"]["b"]["latency_ms"], 12.3);
        assert!(json["services"]["b"].get("error").is_none());
    }

    #[test]
    fn test_status_operational() {
        assert!(HealthStatus::Healthy.is_operational());
        assert!(HealthStatus::Degraded.is_operational());
        assert!(!HealthStatus::Unhealthy.is_operational());
    }
}
