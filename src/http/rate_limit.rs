//! Admission control for upstream forecast APIs.

use governor::{Quota, RateLimiter as GovLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

type DirectLimiter =
    GovLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

/// Shared token bucket gating every network attempt.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limiter: Arc<DirectLimiter>,
}

impl RateLimiter {
    /// `None` when `requests_per_minute` is zero, meaning unlimited.
    #[must_use]
    pub fn per_minute(requests_per_minute: u32) -> Option<Self> {
        NonZeroU32::new(requests_per_minute).map(|quota| Self {
            limiter: Arc::new(GovLimiter::direct(Quota::per_minute(quota))),
        })
    }

    /// Wait until a request slot is available.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Try to acquire a slot without waiting. Returns true if acquired.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}
