//! Outbound pacing
//!
//! The legacy dispatcher slept a fixed 100ms after every send. Here the
//! inter-message delay is a sends-per-minute quota on a `governor` rate
//! limiter with burst 1, so the fixed interval becomes a configuration knob
//! instead of a hardcoded constant. `None` disables pacing (tests, dev).

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;

pub struct Pacer {
    limiter: Option<Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>>,
}

impl Pacer {
    /// Pace sends at the given per-minute quota, one permit at a time.
    pub fn per_minute(sends_per_minute: Option<u32>) -> Self {
        let limiter = sends_per_minute.and_then(|rpm| {
            NonZeroU32::new(rpm).map(|nz| {
                Arc::new(RateLimiter::direct(
                    Quota::per_minute(nz).allow_burst(nonzero!(1u32)),
                ))
            })
        });
        Self { limiter }
    }

    /// No pacing at all.
    pub fn unpaced() -> Self {
        Self { limiter: None }
    }

    pub fn is_paced(&self) -> bool {
        self.limiter.is_some()
    }

    /// Wait until the next send permit is available. Scheduled suspension,
    /// not a busy-wait.
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unpaced_acquire_is_immediate() {
        let pacer = Pacer::unpaced();
        assert!(!pacer.is_paced());
        pacer.acquire().await;
    }

    #[tokio::test]
    async fn zero_quota_disables_pacing() {
        let pacer = Pacer::per_minute(Some(0));
        assert!(!pacer.is_paced());
    }

    #[tokio::test]
    async fn quota_spaces_out_permits() {
        // 60000/min = one permit per millisecond
        let pacer = Pacer::per_minute(Some(60_000));
        assert!(pacer.is_paced());

        let start = std::time::Instant::now();
        for _ in 0..3 {
            pacer.acquire().await;
        }
        // First permit is free; the next two each wait ~1ms
        assert!(start.elapsed() >= std::time::Duration::from_millis(2));
    }
}
