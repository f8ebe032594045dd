//! Automatic remediation of services that go down
//!
//! This module provides:
//! - A per-service sliding-window restart rate limiter
//! - Topology loading with tri-state environment overrides
//! - A detached shell launcher for restart commands

mod executor;
mod rate_limiter;
mod topology;

pub use executor::{build_plan, LaunchPlan, Restarter, ShellRestarter};
pub use rate_limiter::{RestartRateLimiter, MAX_RESTART_ATTEMPTS, RESTART_WINDOW_SECS};
pub use topology::{EnvValue, LaunchMode, StartCommands, Topology, TopologyEntry, TopologyLoader};

use crate::observability::StructuredLogger;
use std::path::PathBuf;
use std::sync::Arc;

/// Reasons a restart could not be launched
#[derive(Debug, thiserror::Error)]
pub enum RemediationError {
    #[error("failed to read topology from {path}: {source}")]
    TopologyRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse topology: {0}")]
    TopologyParse(#[from] serde_yaml::Error),

    #[error("invalid topology config for service {service}: {source}")]
    InvalidEntry {
        service: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no topology config for service: {0}")]
    NoConfiguration(String),

    #[error("no start command for service: {0}")]
    NoStartCommand(String),

    #[error("failed to launch {service}: {source}")]
    Spawn {
        service: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result of one remediation decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemediationOutcome {
    /// Restart command was launched
    Launched,
    /// Denied by the rate limiter; nothing was attempted
    RateLimited,
    /// Allowed, but the restart could not be launched
    Failed(String),
}

impl RemediationOutcome {
    pub fn attempted(&self) -> bool {
        matches!(self, RemediationOutcome::Launched)
    }
}

/// Gate a restart through the rate limiter, then hand it to the restarter.
///
/// The restarter reads the topology and spawns a process, so it runs on the
/// blocking pool.
pub async fn remediate(
    limiter: &mut RestartRateLimiter,
    restarter: Arc<dyn Restarter>,
    service: &str,
    logger: &StructuredLogger,
) -> RemediationOutcome {
    if !limiter.allow(service) {
        logger.log_restart_rate_limited(service, limiter.max_attempts());
        return RemediationOutcome::RateLimited;
    }

    logger.log_restart_attempt(
        service,
        limiter.recorded_attempts(service),
        limiter.max_attempts(),
    );

    let name = service.to_string();
    let result = tokio::task::spawn_blocking(move || restarter.try_restart(&name)).await;

    let failure = match result {
        Ok(Ok(())) => {
            logger.log_restart_initiated(service);
            return RemediationOutcome::Launched;
        }
        Ok(Err(e)) => e.to_string(),
        Err(e) => format!("restart task failed: {}", e),
    };

    logger.log_restart_failed(service, &failure);
    RemediationOutcome::Failed(failure)
}
