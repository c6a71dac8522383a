//! Global token-bucket rate limiter for outbound LLM calls (spec.md §5:
//! "The LLM Gateway enforces a global rate limit"). A sliding window over
//! request timestamps rather than a crate dependency — the semantics are
//! session-agnostic so a plain `Mutex<VecDeque<Instant>>` is enough; no
//! HTTP-layer governor is involved (that's a different concern, see
//! DESIGN.md's note on dropping `tower_governor`).

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::time::sleep;

pub struct RateLimiter {
    capacity: u32,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32) -> Self {
        Self {
            capacity: requests_per_minute.max(1),
            window: Duration::from_secs(60),
            timestamps: Mutex::new(VecDeque::new()),
        }
    }

    /// Block until a slot is free under the rolling window, then consume it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut timestamps = self.timestamps.lock();
                let now = Instant::now();
                while let Some(&front) = timestamps.front() {
                    if now.duration_since(front) >= self.window {
                        timestamps.pop_front();
                    } else {
                        break;
                    }
                }
                if timestamps.len() < self.capacity as usize {
                    timestamps.push_back(now);
                    None
                } else {
                    let oldest = *timestamps.front().unwrap();
                    Some(self.window - now.duration_since(oldest))
                }
            };
            match wait {
                None => return,
                Some(duration) => sleep(duration).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_capacity_immediately() {
        let limiter = RateLimiter::new(2);
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
