// src/edgar/pacing.rs
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

/// Gate consulted before every outbound request.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Resolves once the next request may be issued.
    async fn until_ready(&self);
}

/// Enforces a fixed minimum interval between request starts.
/// Not adaptive: the interval never changes with observed load.
pub struct IntervalLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl IntervalLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }
}

#[async_trait]
impl RateLimiter for IntervalLimiter {
    async fn until_ready(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// No pacing at all.
pub struct Unlimited;

#[async_trait]
impl RateLimiter for Unlimited {
    async fn until_ready(&self) {}
}

/// Fixed pause between larger units of work (companies); zero is a no-op.
pub async fn pause(interval: Duration) {
    if !interval.is_zero() {
        sleep(interval).await;
    }
}
