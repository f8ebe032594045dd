//! Transition detection between consecutive aggregation cycles

use crate::health::{AggregateReport, HealthStatus, ServiceStatus};
use crate::observability::StructuredLogger;
use std::collections::HashMap;

/// A signal emitted when health changes, or stays bad, between cycles
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Service went from healthy to unhealthy
    ServiceDown { service: String, error: String },
    /// Service went from unhealthy to healthy
    ServiceRecovered { service: String },
    /// Service was unhealthy last cycle and still is
    ServiceStillDown { service: String, error: String },
    /// Platform aggregate status changed
    PlatformTransition { from: HealthStatus, to: HealthStatus },
}

impl Signal {
    /// Service to remediate for this signal, if any
    pub fn remediation_target(&self) -> Option<&str> {
        match self {
            Signal::ServiceDown { service, .. } => Some(service),
            _ => None,
        }
    }

    pub fn log(&self, logger: &StructuredLogger) {
        match self {
            Signal::ServiceDown { service, error } => logger.log_service_down(service, error),
            Signal::ServiceRecovered { service } => logger.log_service_recovered(service),
            Signal::ServiceStillDown { service, error } => {
                logger.log_service_still_down(service, error)
            }
            Signal::PlatformTransition { from, to } => logger.log_platform_transition(*from, *to),
        }
    }
}

/// Statuses observed on the previous cycle
#[derive(Debug, Clone, Default)]
pub struct AggregatorState {
    previous_service_status: HashMap<String, ServiceStatus>,
    previous_platform_status: Option<HealthStatus>,
}

impl AggregatorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous_service_status(&self, service: &str) -> Option<ServiceStatus> {
        self.previous_service_status.get(service).copied()
    }

    pub fn previous_platform_status(&self) -> Option<HealthStatus> {
        self.previous_platform_status
    }

    /// Diff `report` against the previous cycle, then record it.
    ///
    /// Nothing is signalled for a service or platform seen for the first time.
    pub fn observe(&mut self, report: &AggregateReport) -> Vec<Signal> {
        let mut signals = Vec::new();

        for (service, result) in &report.services {
            let current = result.status;
            let previous = self.previous_service_status.get(service).copied();

            match (previous, current) {
                (Some(prev), ServiceStatus::Unhealthy) if prev != current => {
                    signals.push(Signal::ServiceDown {
                        service: service.clone(),
                        error: result.error_or_unknown().to_string(),
                    });
                }
                (Some(prev), ServiceStatus::Healthy) if prev != current => {
                    signals.push(Signal::ServiceRecovered {
                        service: service.clone(),
                    });
                }
                (Some(ServiceStatus::Unhealthy), ServiceStatus::Unhealthy) => {
                    signals.push(Signal::ServiceStillDown {
                        service: service.clone(),
                        error: result.error_or_unknown().to_string(),
                    });
                }
                _ => {}
            }
        }

        if let Some(from) = self.previous_platform_status {
            if from != report.status {
                signals.push(Signal::PlatformTransition {
                    from,
                    to: report.status,
                });
            }
        }

        for (service, result) in &report.services {
            self.previous_service_status
                .insert(service.clone(), result.status);
        }
        self.previous_platform_status = Some(report.status);

        signals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::ProbeResult;
    use std::collections::BTreeMap;

    fn report(services: &[(&str, bool)]) -> AggregateReport {
        AggregateReport::new(
            services
                .iter()
                .map(|(name, healthy)| {
                    let result = if *healthy {
                        ProbeResult::healthy(1.0)
                    } else {
                        ProbeResult::unhealthy("timeout", Some(5000.0))
                    };
                    (name.to_string(), result)
                })
                .collect::<BTreeMap<_, _>>(),
        )
    }

    #[test]
    fn test_first_observation_emits_nothing() {
        let mut state = AggregatorState::new();
        assert!(state.observe(&report(&[("x", false), ("y", true)])).is_empty());
        assert_eq!(
            state.previous_service_status("x"),
            Some(ServiceStatus::Unhealthy)
        );
        assert_eq!(state.previous_platform_status(), Some(HealthStatus::Degraded));
    }

    #[test]
    fn test_down_then_still_down() {
        let mut state = AggregatorState::new();

        assert!(state.observe(&report(&[("x", true)])).is_empty());

        let signals = state.observe(&report(&[("x", false)]));
        assert_eq!(
            signals,
            vec![
                Signal::ServiceDown {
                    service: "x".into(),
                    error: "timeout".into()
                },
                Signal::PlatformTransition {
                    from: HealthStatus::Healthy,
                    to: HealthStatus::Degraded
                },
            ]
        );
        assert_eq!(signals[0].remediation_target(), Some("x"));

        let signals = state.observe(&report(&[("x", false)]));
        assert_eq!(
            signals,
            vec![Signal::ServiceStillDown {
                service: "x".into(),
                error: "timeout".into()
            }]
        );
        assert_eq!(signals[0].remediation_target(), None);
    }

    #[test]
    fn test_still_down_repeats_every_cycle() {
        let mut state = AggregatorState::new();
        state.observe(&report(&[("x", false)]));

        for _ in 0..5 {
            let signals = state.observe(&report(&[("x", false)]));
            assert!(matches!(
                signals.as_slice(),
                [Signal::ServiceStillDown { service, .. }] if service == "x"
            ));
        }
    }

    #[test]
    fn test_recovery_signal_fires_once() {
        let mut state = AggregatorState::new();
        state.observe(&report(&[("x", false)]));

        let signals = state.observe(&report(&[("x", true)]));
        assert!(signals.contains(&Signal::ServiceRecovered {
            service: "x".into()
        }));

        let signals = state.observe(&report(&[("x", true)]));
        assert!(signals.is_empty());
    }

    #[test]
    fn test_platform_transitions() {
        let mut state = AggregatorState::new();
        let names = ["a", "b", "c", "d"];
        let cycle = |down: usize| -> AggregateReport {
            let services: Vec<(&str, bool)> = names
                .iter()
                .enumerate()
                .map(|(i, n)| (*n, i >= down))
                .collect();
            report(&services)
        };

        state.observe(&cycle(0));

        let signals = state.observe(&cycle(3));
        assert!(signals.contains(&Signal::PlatformTransition {
            from: HealthStatus::Healthy,
            to: HealthStatus::Unhealthy
        }));

        let signals = state.observe(&cycle(1));
        assert!(signals.contains(&Signal::PlatformTransition {
            from: HealthStatus::Unhealthy,
            to: HealthStatus::Degraded
        }));

        // Same platform status, different services: no platform signal
        let signals = state.observe(&cycle(2));
        assert!(!signals
            .iter()
            .any(|s| matches!(s, Signal::PlatformTransition { .. })));
    }
}
