//! Per-client sliding-window request ledger

use crate::config::RateLimitSettings;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Ledger size at which keys with no live timestamps are swept
const SWEEP_THRESHOLD: usize = 1024;

/// Admission control keyed by client
pub trait RateLimiter: Send + Sync {
    /// Record a request from `key`, returning false when it is over the limit
    fn allow(&self, key: &str) -> bool;

    /// Requests admitted per window
    fn max_requests(&self) -> usize;

    fn window(&self) -> Duration;
}

/// Admits at most `max_requests` per `window` for each key
///
/// Refused requests are not recorded, so a client that keeps retrying is
/// let back in as soon as its oldest admitted request leaves the window.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_requests: usize,
    window: Duration,
    ledger: Mutex<HashMap<String, Vec<Instant>>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            ledger: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &RateLimitSettings) -> Self {
        Self::new(settings.requests, Duration::from_secs(settings.window_secs))
    }

    /// [`RateLimiter::allow`] at an explicit instant
    pub fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut ledger = self.ledger.lock().unwrap_or_else(|e| e.into_inner());

        if ledger.len() >= SWEEP_THRESHOLD {
            let window = self.window;
            ledger.retain(|_, stamps| stamps.iter().any(|t| now.duration_since(*t) < window));
        }

        let stamps = ledger.entry(key.to_string()).or_default();
        stamps.retain(|t| now.duration_since(*t) < self.window);

        if stamps.len() >= self.max_requests {
            return false;
        }
        stamps.push(now);
        true
    }

    /// Clients currently tracked
    pub fn tracked_keys(&self) -> usize {
        self.ledger.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn max_requests(&self) -> usize {
        self.max_requests
    }

    fn window(&self) -> Duration {
        self.window
    }
}
