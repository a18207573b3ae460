//! Request rate limiting
//!
//! Sliding-window limiter keyed by client identity, behind a trait so
//! a multi-instance deployment can swap in one backed by an external
//! fast key-value store. The bundled [`SlidingWindowLimiter`] keeps
//! its windows in process memory: acceptable to lose on restart, and
//! NOT suitable for multi-instance deployments.

use std::collections::VecDeque;

use dashmap::DashMap;
use shared::util::now_millis;

/// Outcome of a rate check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Requests left in the current window (0 when denied)
    pub remaining: u32,
    /// When the oldest counted request falls out of the window (ms)
    pub reset_at_ms: i64,
}

pub trait RateLimiter: Send + Sync {
    fn check(&self, key: &str) -> RateDecision;
}

/// In-process sliding window over request timestamps
pub struct SlidingWindowLimiter {
    max_requests: u32,
    window_ms: i64,
    hits: DashMap<String, VecDeque<i64>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: u32, window_ms: i64) -> Self {
        Self {
            max_requests,
            window_ms,
            hits: DashMap::new(),
        }
    }

    fn check_at(&self, key: &str, now_ms: i64) -> RateDecision {
        let mut window = self.hits.entry(key.to_string()).or_default();

        let cutoff = now_ms - self.window_ms;
        while window.front().is_some_and(|&t| t <= cutoff) {
            window.pop_front();
        }

        if window.len() >= self.max_requests as usize {
            let reset_at_ms = window.front().map(|&t| t + self.window_ms).unwrap_or(now_ms);
            return RateDecision {
                allowed: false,
                remaining: 0,
                reset_at_ms,
            };
        }

        window.push_back(now_ms);
        let remaining = self.max_requests - window.len() as u32;
        let reset_at_ms = window.front().map(|&t| t + self.window_ms).unwrap_or(now_ms);
        RateDecision {
            allowed: true,
            remaining,
            reset_at_ms,
        }
    }
}

impl RateLimiter for SlidingWindowLimiter {
    fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, now_millis())
    }
}
