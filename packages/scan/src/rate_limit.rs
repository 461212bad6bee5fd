//! Minimum spacing between consecutive provider calls.

use std::time::Duration;

use tokio::time::Instant;

/// Enforces a minimum interval between calls to [`RateLimiter::wait`].
///
/// The first call never waits. Later calls sleep only for whatever part of
/// the interval has not already elapsed since the previous call.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last: Option<Instant>,
}

impl RateLimiter {
    /// Creates a limiter with the given minimum interval.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Waits until the interval since the previous call has passed.
    pub async fn wait(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        self.last = Some(Instant::now());
    }
}
