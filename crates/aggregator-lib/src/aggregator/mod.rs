//! Health aggregation
//!
//! Fans out one probe per configured service, derives the platform status,
//! and diffs it against the previous cycle to decide which signals to emit
//! and which services to restart.

mod transitions;

pub use transitions::{AggregatorState, Signal};

use crate::health::{AggregateReport, ProbeResult};
use crate::models::ServiceEndpoint;
use crate::observability::StructuredLogger;
use crate::probe::Prober;
use crate::remediation::{remediate, RemediationOutcome, RestartRateLimiter, Restarter};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Everything one aggregation cycle produced
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub report: AggregateReport,
    pub signals: Vec<Signal>,
    pub remediations: Vec<(String, RemediationOutcome)>,
}

/// Mutable state carried between cycles
struct CycleState {
    state: AggregatorState,
    limiter: RestartRateLimiter,
}

/// Aggregates health across a fixed set of services
///
/// At most one cycle runs at a time: concurrent callers queue on the cycle
/// lock, so transitions are never double-counted and restarts never
/// duplicated.
pub struct HealthAggregator {
    services: Vec<ServiceEndpoint>,
    prober: Arc<dyn Prober>,
    restarter: Arc<dyn Restarter>,
    logger: StructuredLogger,
    cycle: Mutex<CycleState>,
}

impl HealthAggregator {
    pub fn new(
        services: Vec<ServiceEndpoint>,
        prober: Arc<dyn Prober>,
        restarter: Arc<dyn Restarter>,
    ) -> Self {
        Self {
            services,
            prober,
            restarter,
            logger: StructuredLogger::new("health-aggregator"),
            cycle: Mutex::new(CycleState {
                state: AggregatorState::new(),
                limiter: RestartRateLimiter::default(),
            }),
        }
    }

    /// Replace the default restart rate limiter
    pub fn with_rate_limiter(mut self, limiter: RestartRateLimiter) -> Self {
        self.cycle.get_mut().limiter = limiter;
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn services(&self) -> &[ServiceEndpoint] {
        &self.services
    }

    /// Run one cycle and return the report
    pub async fn check_all(&self) -> AggregateReport {
        self.check_cycle().await.report
    }

    /// Run one cycle: probe, aggregate, detect transitions, remediate
    pub async fn check_cycle(&self) -> CycleOutcome {
        let mut guard = self.cycle.lock().await;
        let CycleState { state, limiter } = &mut *guard;

        let results = self.probe_all().await;
        let report = AggregateReport::new(results);

        let signals = state.observe(&report);
        let mut remediations = Vec::new();

        for signal in &signals {
            signal.log(&self.logger);

            if let Some(service) = signal.remediation_target() {
                let outcome =
                    remediate(limiter, self.restarter.clone(), service, &self.logger).await;
                remediations.push((service.to_string(), outcome));
            }
        }

        CycleOutcome {
            report,
            signals,
            remediations,
        }
    }

    /// Probe every service concurrently and wait for all of them
    async fn probe_all(&self) -> BTreeMap<String, ProbeResult> {
        let probes = self
            .services
            .iter()
            .map(|endpoint| self.prober.probe(endpoint));
        let results = join_all(probes).await;

        self.services
            .iter()
            .map(|endpoint| endpoint.name.clone())
            .zip(results)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::{HealthStatus, ServiceStatus};
    use crate::remediation::RemediationError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::time::{Duration, Instant};

    /// Prober whose answers are set by the test
    #[derive(Default)]
    struct MockProber {
        unhealthy: std::sync::Mutex<HashMap<String, String>>,
        delay: Option<Duration>,
    }

    impl MockProber {
        fn set_down(&self, service: &str, error: &str) {
            self.unhealthy
                .lock()
                .unwrap()
                .insert(service.to_string(), error.to_string());
        }

        fn set_up(&self, service: &str) {
            self.unhealthy.lock().unwrap().remove(service);
        }
    }

    #[async_trait]
    impl Prober for MockProber {
        async fn probe(&self, endpoint: &ServiceEndpoint) -> ProbeResult {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let error = self.unhealthy.lock().unwrap().get(&endpoint.name).cloned();
            match error {
                Some(e) => ProbeResult::unhealthy(e, Some(1.0)),
                None => ProbeResult::healthy(1.0),
            }
        }
    }

    #[derive(Default)]
    struct MockRestarter {
        calls: std::sync::Mutex<Vec<String>>,
    }

    impl Restarter for MockRestarter {
        fn try_restart(&self, service_name: &str) -> Result<(), RemediationError> {
            self.calls.lock().unwrap().push(service_name.to_string());
            Ok(())
        }
    }

    fn endpoints(n: usize) -> Vec<ServiceEndpoint> {
        (0..n)
            .map(|i| ServiceEndpoint::new(format!("svc-{}", i), format!("http://svc-{}/health", i)))
            .collect()
    }

    fn setup(n: usize) -> (HealthAggregator, Arc<MockProber>, Arc<MockRestarter>) {
        let prober = Arc::new(MockProber::default());
        let restarter = Arc::new(MockRestarter::default());
        let aggregator = HealthAggregator::new(endpoints(n), prober.clone(), restarter.clone());
        (aggregator, prober, restarter)
    }

    #[tokio::test]
    async fn test_report_has_one_entry_per_service() {
        let (aggregator, prober, _) = setup(6);
        prober.set_down("svc-1", "timeout");
        prober.set_down("svc-4", "HTTP 500");

        let report = aggregator.check_all().await;

        assert_eq!(report.services.len(), 6);
        for endpoint in aggregator.services() {
            assert!(report.services.contains_key(&endpoint.name));
        }
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.services["svc-4"].error.as_deref(), Some("HTTP 500"));
    }

    #[tokio::test]
    async fn test_three_of_six_down_is_unhealthy() {
        let (aggregator, prober, _) = setup(6);
        for name in ["svc-0", "svc-2", "svc-5"] {
            prober.set_down(name, "connection refused: os error 111");
        }

        let report = aggregator.check_all().await;
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert_eq!(report.unhealthy_count(), 3);
    }

    #[tokio::test]
    async fn test_down_still_down_scenario_restarts_once() {
        let prober = Arc::new(MockProber::default());
        let restarter = Arc::new(MockRestarter::default());
        let aggregator = HealthAggregator::new(
            vec![ServiceEndpoint::new("x", "http://x/health")],
            prober.clone(),
            restarter.clone(),
        );

        // Cycle 1: healthy, no prior state
        let outcome = aggregator.check_cycle().await;
        assert!(outcome.signals.is_empty());
        assert!(outcome.remediations.is_empty());

        // Cycle 2: goes down
        prober.set_down("x", "timeout");
        let outcome = aggregator.check_cycle().await;
        assert!(outcome.signals.contains(&Signal::ServiceDown {
            service: "x".into(),
            error: "timeout".into()
        }));
        assert_eq!(
            outcome.remediations,
            vec![("x".to_string(), RemediationOutcome::Launched)]
        );

        // Cycle 3: still down, reminder only
        let outcome = aggregator.check_cycle().await;
        assert_eq!(
            outcome.signals,
            vec![Signal::ServiceStillDown {
                service: "x".into(),
                error: "timeout".into()
            }]
        );
        assert!(outcome.remediations.is_empty());

        assert_eq!(*restarter.calls.lock().unwrap(), vec!["x".to_string()]);
    }

    #[tokio::test]
    async fn test_down_on_first_cycle_does_not_restart() {
        let (aggregator, prober, restarter) = setup(2);
        prober.set_down("svc-0", "timeout");

        let outcome = aggregator.check_cycle().await;
        assert!(outcome.signals.is_empty());
        assert!(restarter.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_flapping_service_is_rate_limited() {
        let (aggregator, prober, restarter) = setup(1);
        aggregator.check_cycle().await;

        let mut outcomes = Vec::new();
        for _ in 0..4 {
            prober.set_down("svc-0", "timeout");
            let outcome = aggregator.check_cycle().await;
            outcomes.extend(outcome.remediations.into_iter().map(|(_, o)| o));
            prober.set_up("svc-0");
            aggregator.check_cycle().await;
        }

        assert_eq!(
            outcomes,
            vec![
                RemediationOutcome::Launched,
                RemediationOutcome::Launched,
                RemediationOutcome::Launched,
                RemediationOutcome::RateLimited,
            ]
        );
        assert_eq!(restarter.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_custom_rate_limiter() {
        let prober = Arc::new(MockProber::default());
        let restarter = Arc::new(MockRestarter::default());
        let aggregator = HealthAggregator::new(endpoints(1), prober.clone(), restarter.clone())
            .with_rate_limiter(RestartRateLimiter::new(1, Duration::from_secs(3600)));

        aggregator.check_cycle().await;
        prober.set_down("svc-0", "timeout");
        aggregator.check_cycle().await;
        prober.set_up("svc-0");
        aggregator.check_cycle().await;
        prober.set_down("svc-0", "timeout");
        let outcome = aggregator.check_cycle().await;

        assert_eq!(
            outcome.remediations,
            vec![("svc-0".to_string(), RemediationOutcome::RateLimited)]
        );
    }

    #[tokio::test]
    async fn test_probes_run_concurrently() {
        let prober = Arc::new(MockProber {
            delay: Some(Duration::from_millis(100)),
            ..Default::default()
        });
        let aggregator =
            HealthAggregator::new(endpoints(10), prober, Arc::new(MockRestarter::default()));

        let start = Instant::now();
        let report = aggregator.check_all().await;

        assert_eq!(report.services.len(), 10);
        assert!(
            start.elapsed() < Duration::from_millis(600),
            "probes ran sequentially: {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn test_concurrent_cycles_do_not_double_count() {
        let prober = Arc::new(MockProber {
            delay: Some(Duration::from_millis(20)),
            ..Default::default()
        });
        let restarter = Arc::new(MockRestarter::default());
        let aggregator = HealthAggregator::new(endpoints(1), prober.clone(), restarter.clone());

        aggregator.check_cycle().await;
        prober.set_down("svc-0", "timeout");

        let (first, second) = tokio::join!(aggregator.check_cycle(), aggregator.check_cycle());
        let signals: Vec<Signal> = first.signals.into_iter().chain(second.signals).collect();

        let downs = signals
            .iter()
            .filter(|s| matches!(s, Signal::ServiceDown { .. }))
            .count();
        let still_downs = signals
            .iter()
            .filter(|s| matches!(s, Signal::ServiceStillDown { .. }))
            .count();
        assert_eq!(downs, 1);
        assert_eq!(still_downs, 1);
        assert_eq!(restarter.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_report_status_matches_service_statuses() {
        let (aggregator, prober, _) = setup(3);
        prober.set_down("svc-1", "timeout");

        let report = aggregator.check_all().await;
        assert_eq!(report.services["svc-0"].status, ServiceStatus::Healthy);
        assert_eq!(report.services["svc-1"].status, ServiceStatus::Unhealthy);
        assert!(report.timestamp.ends_with('Z'));
    }
}
