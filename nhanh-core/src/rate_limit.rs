//! Sliding-window request limiter.
//!
//! Nhanh.vn counts requests per 30 second window. One limiter is created per
//! [`Client`](crate::Client) and shared by all of its modules, so every
//! authenticated call passes through the same acquisition point.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Window the platform applies its request quota to.
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(30);

/// Upper bound on slots reserved up front; larger limits grow on demand.
const MAX_PREALLOCATED: usize = 1024;

/// Sliding-window limiter allowing `max_requests` per `window`.
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    issued: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Create a limiter for `max_requests` per `window`.
    ///
    /// A `max_requests` of zero is treated as one.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        let max_requests = max_requests.max(1);
        Self {
            max_requests,
            window,
            issued: Mutex::new(VecDeque::with_capacity(
                (max_requests as usize).min(MAX_PREALLOCATED),
            )),
        }
    }

    /// Limiter over the platform's 30 second window.
    pub fn per_window(max_requests: u32) -> Self {
        Self::new(max_requests, RATE_LIMIT_WINDOW)
    }

    /// Permits per window.
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Take a permit if one is free right now.
    pub fn try_acquire(&self) -> bool {
        self.reserve(Instant::now()).is_none()
    }

    /// Wait until a permit is free, then take it.
    pub async fn acquire(&self) {
        loop {
            match self.reserve(Instant::now()) {
                None => return,
                Some(wait) => {
                    tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Permits still available in the current window.
    pub fn available(&self) -> u32 {
        let mut issued = self.issued.lock();
        Self::evict(&mut issued, Instant::now(), self.window);
        self.max_requests.saturating_sub(issued.len() as u32)
    }

    /// Record a permit at `now`, or return how long until one frees up.
    fn reserve(&self, now: Instant) -> Option<Duration> {
        let mut issued = self.issued.lock();
        Self::evict(&mut issued, now, self.window);

        if (issued.len() as u32) < self.max_requests {
            issued.push_back(now);
            return None;
        }

        issued
            .front()
            .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
    }

    fn evict(issued: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(oldest) = issued.front() {
            if now.duration_since(*oldest) >= window {
                issued.pop_front();
            } else {
                break;
            }
        }
    }
}
