//! Core data models for the health aggregator

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A downstream service health endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    pub name: String,
    pub url: String,
}

impl ServiceEndpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Platform services polled when no explicit set is configured
pub const DEFAULT_SERVICES: &[(&str, &str)] = &[
    ("ai-agents", "http://localhost:8082/health"),
    ("inference-service", "http://localhost:8085/health"),
    ("llm-gateway", "http://localhost:8080/health"),
    ("semantic-search", "http://localhost:8081/health"),
    ("audit-service", "http://localhost:8084/health"),
    ("code-orchestrator", "http://localhost:8083/health"),
];

/// Health-check names that differ from their topology identifier
pub const DEFAULT_SERVICE_ALIASES: &[(&str, &str)] = &[("inference-service", "inference")];

pub fn default_services() -> Vec<ServiceEndpoint> {
    DEFAULT_SERVICES
        .iter()
        .map(|(name, url)| ServiceEndpoint::new(*name, *url))
        .collect()
}

pub fn default_service_aliases() -> HashMap<String, String> {
    DEFAULT_SERVICE_ALIASES
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect()
}
