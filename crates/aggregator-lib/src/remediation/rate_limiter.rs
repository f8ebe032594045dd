//! Per-service sliding-window restart limiter

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Maximum restart attempts per service inside one window
pub const MAX_RESTART_ATTEMPTS: usize = 3;

/// Length of the trailing window (1 hour)
pub const RESTART_WINDOW_SECS: u64 = 60 * 60;

/// Sliding-window counter of restart attempts, keyed by service name.
///
/// Stale attempts are pruned lazily on each check. The oldest attempt
/// expiring frees exactly one slot; there is no periodic reset.
#[derive(Debug)]
pub struct RestartRateLimiter {
    max_attempts: usize,
    window: Duration,
    attempts: HashMap<String, VecDeque<Instant>>,
}

impl Default for RestartRateLimiter {
    fn default() -> Self {
        Self::new(MAX_RESTART_ATTEMPTS, Duration::from_secs(RESTART_WINDOW_SECS))
    }
}

impl RestartRateLimiter {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            attempts: HashMap::new(),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Check and record an attempt for `service` at the current instant
    pub fn allow(&mut self, service: &str) -> bool {
        self.allow_at(service, Instant::now())
    }

    /// Check and record an attempt for `service` at `now`.
    ///
    /// Returns false without recording when the window is already full.
    pub fn allow_at(&mut self, service: &str, now: Instant) -> bool {
        let window = self.window;
        let attempts = self.attempts.entry(service.to_string()).or_default();

        while let Some(oldest) = attempts.front() {
            if now.saturating_duration_since(*oldest) >= window {
                attempts.pop_front();
            } else {
                break;
            }
        }

        if attempts.len() >= self.max_attempts {
            return false;
        }

        attempts.push_back(now);
        true
    }

    /// Attempts recorded for `service` as of the last check
    pub fn recorded_attempts(&self, service: &str) -> usize {
        self.attempts.get(service).map_or(0, VecDeque::len)
    }
}
