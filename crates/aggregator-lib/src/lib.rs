//! Health aggregation and auto-remediation library
//!
//! This crate provides the core functionality for:
//! - Probing downstream service health endpoints
//! - Aggregating platform health and detecting transitions
//! - Rate-limited automatic restart of services that go down
//! - Prometheus gauges and structured logging

pub mod aggregator;
pub mod collector;
pub mod health;
pub mod models;
pub mod observability;
pub mod probe;
pub mod remediation;

pub use aggregator::{AggregatorState, CycleOutcome, HealthAggregator, Signal};
pub use health::{AggregateReport, HealthStatus, ProbeResult, ServiceStatus};
pub use models::*;
pub use observability::{HealthMetrics, StructuredLogger};
pub use probe::{HttpProber, ProbeError, Prober};
