//! Per-address sliding window limiter for the login route.

use std::{
    collections::HashMap,
    net::IpAddr,
    sync::Arc,
    time::{Duration, Instant},
};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::RateLimitConfig;

#[derive(Debug, Error)]
#[error("Too many attempts, retry in {}s", .retry_after.as_secs())]
pub struct RateLimited {
    pub retry_after: Duration,
}

struct Attempts {
    /// Map of address -> timestamps of attempts inside the window
    by_addr: HashMap<IpAddr, Vec<Instant>>,
    last_cleanup: Instant,
}

/// Cheap to clone; clones share the same counters.
#[derive(Clone)]
pub struct RateLimiter {
    attempts: Arc<Mutex<Attempts>>,
    max_attempts: usize,
    window: Duration,
}

impl RateLimiter {
    #[must_use]
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            attempts: Arc::new(Mutex::new(Attempts {
                by_addr: HashMap::new(),
                last_cleanup: Instant::now(),
            })),
            max_attempts,
            window,
        }
    }

    #[must_use]
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(
            config.max_attempts as usize,
            Duration::from_secs(config.window_seconds),
        )
    }

    /// Records an attempt from `addr` at `now`, or rejects it when the address
    /// already used up its attempts inside the window. Rejected attempts are
    /// not recorded.
    pub async fn check(&self, addr: IpAddr, now: Instant) -> Result<(), RateLimited> {
        let mut attempts = self.attempts.lock().await;

        if now.duration_since(attempts.last_cleanup) >= self.window {
            let window = self.window;
            attempts
                .by_addr
                .retain(|_, ts| ts.iter().any(|&t| now.duration_since(t) < window));
            attempts.last_cleanup = now;
        }

        let timestamps = attempts.by_addr.entry(addr).or_default();
        timestamps.retain(|&t| now.duration_since(t) < self.window);

        if timestamps.len() >= self.max_attempts {
            let oldest = timestamps.first().copied().unwrap_or(now);
            let retry_after = self.window.saturating_sub(now.duration_since(oldest));
            return Err(RateLimited { retry_after });
        }

        timestamps.push(now);
        Ok(())
    }

    #[cfg(test)]
    async fn tracked_addresses(&self) -> usize {
        self.attempts.lock().await.by_addr.len()
    }
}
