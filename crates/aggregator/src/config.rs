//! Aggregator configuration

use aggregator_lib::models::{default_service_aliases, default_services, ServiceEndpoint};
use aggregator_lib::probe::DEFAULT_PROBE_TIMEOUT;
use aggregator_lib::remediation::{MAX_RESTART_ATTEMPTS, RESTART_WINDOW_SECS};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Config file looked up when `AGGREGATOR_CONFIG` is not set (any supported extension)
const DEFAULT_CONFIG_FILE: &str = "health-aggregator";

/// Aggregator configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// Instance name attached to every log event
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Per-probe timeout in milliseconds
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Background collection interval in seconds
    #[serde(default = "default_collection_interval")]
    pub collection_interval_secs: u64,

    /// Whether to run the background collector
    #[serde(default = "default_collector_enabled")]
    pub collector_enabled: bool,

    /// Topology file read on every restart attempt
    #[serde(default = "default_topology_path")]
    pub topology_path: PathBuf,

    /// Base directory that topology service paths are relative to
    #[serde(default = "default_platform_root")]
    pub platform_root: PathBuf,

    #[serde(default = "default_max_restart_attempts")]
    pub max_restart_attempts: usize,

    #[serde(default = "default_restart_window")]
    pub restart_window_secs: u64,

    /// Service name to health endpoint URL
    #[serde(default = "default_service_map")]
    pub services: HashMap<String, String>,

    /// Health-check name to topology identifier
    #[serde(default = "default_service_aliases")]
    pub service_aliases: HashMap<String, String>,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "health-aggregator".to_string())
}

fn default_api_port() -> u16 {
    8088
}

fn default_probe_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT.as_millis() as u64
}

fn default_collection_interval() -> u64 {
    30
}

fn default_collector_enabled() -> bool {
    true
}

fn default_topology_path() -> PathBuf {
    PathBuf::from("topology.yaml")
}

fn default_platform_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_max_restart_attempts() -> usize {
    MAX_RESTART_ATTEMPTS
}

fn default_restart_window() -> u64 {
    RESTART_WINDOW_SECS
}

fn default_service_map() -> HashMap<String, String> {
    default_services()
        .into_iter()
        .map(|endpoint| (endpoint.name, endpoint.url))
        .collect()
}

impl AggregatorConfig {
    /// Load configuration from an optional config file and the environment
    pub fn load() -> Result<Self> {
        let file = std::env::var("AGGREGATOR_CONFIG")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name(&file).required(false))
            .add_source(config::Environment::with_prefix("AGGREGATOR").try_parsing(true))
            .build()
            .context("Failed to read aggregator configuration")?;

        config
            .try_deserialize()
            .context("Invalid aggregator configuration")
    }

    /// Configured services, ordered by name
    pub fn endpoints(&self) -> Vec<ServiceEndpoint> {
        let mut endpoints: Vec<ServiceEndpoint> = self
            .services
            .iter()
            .map(|(name, url)| ServiceEndpoint::new(name.clone(), url.clone()))
            .collect();
        endpoints.sort_by(|a, b| a.name.cmp(&b.name));
        endpoints
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn collection_interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval_secs)
    }

    pub fn restart_window(&self) -> Duration {
        Duration::from_secs(self.restart_window_secs)
    }
}
