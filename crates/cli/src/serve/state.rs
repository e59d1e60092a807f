//! Application state and rate limiting.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use relay_core::Orchestrator;
use tokio::sync::Mutex;

use super::RATE_LIMIT_WINDOW_SECS;

/// Per-IP request tracker: (request count, window start time).
type IpTracker = HashMap<IpAddr, (u64, Instant)>;

/// In-memory per-IP rate limiter.
pub(crate) struct RateLimiter {
    tracker: Mutex<IpTracker>,
    /// Maximum requests per window.
    pub(crate) max_requests: u64,
}

impl RateLimiter {
    pub(crate) fn new(max_requests: u64) -> Self {
        Self {
            tracker: Mutex::new(HashMap::new()),
            max_requests,
        }
    }

    /// Check if a request from the given IP is allowed.
    /// Returns Ok(()) if allowed, Err(retry_after_secs) if rate limited.
    pub(crate) async fn check(&self, ip: IpAddr) -> Result<(), u64> {
        let mut tracker = self.tracker.lock().await;
        let now = Instant::now();

        let entry = tracker.entry(ip).or_insert((0, now));

        let elapsed = now.duration_since(entry.1).as_secs();
        if elapsed >= RATE_LIMIT_WINDOW_SECS {
            entry.0 = 0;
            entry.1 = now;
        }

        entry.0 += 1;
        if entry.0 > self.max_requests {
            Err(RATE_LIMIT_WINDOW_SECS.saturating_sub(elapsed))
        } else {
            Ok(())
        }
    }
}

/// Shared across request handlers.
pub(crate) struct AppState {
    pub(crate) orchestrator: Arc<Orchestrator>,
    /// Callback route → contract hash.
    pub(crate) callbacks: HashMap<String, String>,
    pub(crate) rate_limiter: RateLimiter,
    /// None = no auth required.
    pub(crate) api_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn limiter_blocks_after_max_requests() {
        let limiter = RateLimiter::new(2);
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        assert!(limiter.check(ip).await.is_ok());
        assert!(limiter.check(ip).await.is_ok());
        let retry_after = limiter.check(ip).await.unwrap_err();
        assert!(retry_after <= RATE_LIMIT_WINDOW_SECS);
    }

    #[tokio::test]
    async fn limiter_tracks_ips_separately() {
        let limiter = RateLimiter::new(1);
        let a = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let b = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));
        assert!(limiter.check(a).await.is_ok());
        assert!(limiter.check(b).await.is_ok());
        assert!(limiter.check(a).await.is_err());
    }
}
