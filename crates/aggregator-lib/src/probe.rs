//! Service probing
//!
//! A probe is a single bounded-timeout HTTP GET against one service's
//! health endpoint. Every failure is classified into a [`ProbeError`] and
//! folded into the returned [`ProbeResult`]; nothing escapes the prober.

use crate::health::ProbeResult;
use crate::models::ServiceEndpoint;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{redirect, Client, StatusCode};
use std::time::{Duration, Instant};

/// Default upper bound on a whole probe (connect + response)
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Classified probe failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("timeout")]
    Timeout,

    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    #[error("HTTP {0}")]
    HttpStatus(u16),

    #[error("{0}")]
    Transport(String),
}

impl From<reqwest::Error> for ProbeError {
    fn from(e: reqwest::Error) -> Self {
        // A connect that stalls past the deadline reports both flags
        if e.is_timeout() {
            ProbeError::Timeout
        } else if e.is_connect() {
            ProbeError::ConnectionRefused(e.to_string())
        } else {
            ProbeError::Transport(e.to_string())
        }
    }
}

/// Trait for health probe implementations
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe one endpoint. Never fails; failures are captured in the result.
    async fn probe(&self, endpoint: &ServiceEndpoint) -> ProbeResult;
}

/// HTTP prober backed by a shared reqwest client
pub struct HttpProber {
    client: Client,
    timeout: Duration,
}

impl HttpProber {
    /// Create a prober whose requests are bounded by `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(redirect::Policy::none())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issue the GET and classify the response status
    async fn check(&self, url: &str) -> Result<(), ProbeError> {
        let response = self.client.get(url).send().await?;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(ProbeError::HttpStatus(status.as_u16())),
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, endpoint: &ServiceEndpoint) -> ProbeResult {
        let start = Instant::now();
        let outcome = self.check(&endpoint.url).await;
        let latency_ms = round_ms(start.elapsed());

        match outcome {
            Ok(()) => ProbeResult::healthy(latency_ms),
            Err(e) => ProbeResult::unhealthy(e.to_string(), Some(latency_ms)),
        }
    }
}

/// Milliseconds rounded to two decimal places
pub fn round_ms(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}
