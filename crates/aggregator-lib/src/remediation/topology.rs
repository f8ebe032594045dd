//! Service topology loading
//!
//! The topology file maps each service identifier to its working directory,
//! start commands per launch mode, and environment overrides. It is read
//! fresh for every restart attempt so edits apply without restarting the
//! aggregator.

use super::RemediationError;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

/// Prefix marking a template placeholder that was never filled in
const PLACEHOLDER_PREFIX: &str = "${";

/// Parsed topology document
///
/// Entries stay as raw YAML until one is requested, so a malformed entry
/// only affects restarts of that service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub services: HashMap<String, serde_yaml::Value>,
}

impl Topology {
    pub fn from_yaml(content: &str) -> Result<Self, RemediationError> {
        serde_yaml::from_str(content).map_err(RemediationError::TopologyParse)
    }

    /// Decode the entry for one service
    pub fn entry(&self, service: &str) -> Result<TopologyEntry, RemediationError> {
        let raw = self
            .services
            .get(service)
            .ok_or_else(|| RemediationError::NoConfiguration(service.to_string()))?;

        serde_yaml::from_value(raw.clone()).map_err(|source| RemediationError::InvalidEntry {
            service: service.to_string(),
            source,
        })
    }
}

/// One service's launch configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopologyEntry {
    #[serde(default)]
    pub path: PathBuf,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default = "default_health_endpoint")]
    pub health_endpoint: String,
    #[serde(default)]
    pub start: StartCommands,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, EnvValue>,
}

fn default_health_endpoint() -> String {
    "/health".to_string()
}

/// Launch form of a start command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchMode {
    Native,
    Docker,
}

impl fmt::Display for LaunchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaunchMode::Native => write!(f, "native"),
            LaunchMode::Docker => write!(f, "docker"),
        }
    }
}

/// Start commands keyed by launch mode
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StartCommands {
    #[serde(default)]
    pub native: Option<String>,
    #[serde(default)]
    pub docker: Option<String>,
}

impl StartCommands {
    /// Pick the command to run, preferring native over docker
    pub fn resolve(&self) -> Option<(LaunchMode, &str)> {
        non_empty(&self.native)
            .map(|cmd| (LaunchMode::Native, cmd))
            .or_else(|| non_empty(&self.docker).map(|cmd| (LaunchMode::Docker, cmd)))
    }
}

fn non_empty(cmd: &Option<String>) -> Option<&str> {
    cmd.as_deref().map(str::trim).filter(|c| !c.is_empty())
}

/// Environment override for a launched service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "Option<RawEnvValue>")]
pub enum EnvValue {
    /// Concrete value passed to the process
    Value(String),
    /// Explicit null: the variable is removed from the inherited environment
    Unset,
    /// Template placeholder never resolved; skipped entirely
    Unresolved(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEnvValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl From<Option<RawEnvValue>> for EnvValue {
    fn from(raw: Option<RawEnvValue>) -> Self {
        match raw {
            None => EnvValue::Unset,
            Some(RawEnvValue::Text(s)) if s.starts_with(PLACEHOLDER_PREFIX) => {
                EnvValue::Unresolved(s)
            }
            Some(RawEnvValue::Text(s)) => EnvValue::Value(s),
            Some(RawEnvValue::Integer(i)) => EnvValue::Value(i.to_string()),
            Some(RawEnvValue::Float(f)) => EnvValue::Value(f.to_string()),
            Some(RawEnvValue::Bool(b)) => EnvValue::Value(b.to_string()),
        }
    }
}

/// Reads the topology file from disk on every call
#[derive(Debug, Clone)]
pub struct TopologyLoader {
    path: PathBuf,
}

impl TopologyLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Topology, RemediationError> {
        let content = std::fs::read_to_string(&self.path).map_err(|source| {
            RemediationError::TopologyRead {
                path: self.path.clone(),
                source,
            }
        })?;

        Topology::from_yaml(&content)
    }
}
