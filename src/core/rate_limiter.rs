//! Per-operation pacing of transport calls.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Enforces a fixed delay between consecutive transport calls of one
/// operation. Each executor owns its own limiter, so waiting here never
/// holds up another operation.
#[derive(Debug)]
pub struct RateLimiter {
    delay: Duration,
    calls: u64,
}

impl RateLimiter {
    /// Limiter spacing calls by `delay`.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay, calls: 0 }
    }

    /// Configured spacing.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait until the next call may proceed. The first call goes through
    /// immediately. Returns `false` when `cancel` fires first.
    pub async fn wait(&mut self, cancel: &CancellationToken) -> bool {
        let first = self.calls == 0;
        self.calls += 1;
        if first || self.delay.is_zero() {
            return !cancel.is_cancelled();
        }
        tokio::select! {
            () = cancel.cancelled() => false,
            () = tokio::time::sleep(self.delay) => !cancel.is_cancelled(),
        }
    }
}
