//! Token bucket state and refill arithmetic.

use std::time::Duration;
use tokio::time::Instant;

use crate::error::FloodgateError;

/// A bucket of admission credits refilled at a steady rate.
///
/// All state transitions go through [`refill`](TokenBucket::refill): credits
/// accrue lazily from the elapsed time since the last update, so no timer is
/// needed to keep the balance current. The balance never exceeds `capacity`
/// and never goes negative; a take that would overdraw is refused instead.
pub(crate) struct TokenBucket {
    /// Maximum credits the bucket can bank (burst allowance).
    capacity: f64,
    /// Credits restored per second.
    refill_rate: f64,
    /// Current balance.
    available: f64,
    /// Monotonic clock reading at the last balance update.
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    pub(crate) fn new(capacity: f64, refill_rate: f64, now: Instant) -> Self {
        Self {
            capacity,
            refill_rate,
            available: capacity,
            last_refill: now,
        }
    }

    /// Settle credits accrued since the last update.
    pub(crate) fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.available =
            (self.available + self.refill_rate * elapsed.as_secs_f64()).min(self.capacity);
        self.last_refill = now;
    }

    /// Take `cost` credits if the balance covers them.
    ///
    /// Returns `false` with no state change beyond the refill otherwise.
    pub(crate) fn try_take(&mut self, cost: f64, now: Instant) -> bool {
        self.refill(now);
        if self.available >= cost {
            self.available -= cost;
            true
        } else {
            false
        }
    }

    /// How long until `cost` credits will have accrued; zero if they already
    /// have.
    ///
    /// Fails with [`FloodgateError::Unbounded`] when the balance can never
    /// reach `cost`: the refill rate is zero, `cost` exceeds the capacity,
    /// or the wait is too long to represent as a `Duration`.
    pub(crate) fn time_until_available(
        &mut self,
        cost: f64,
        now: Instant,
    ) -> Result<Duration, FloodgateError> {
        self.refill(now);
        if self.available >= cost {
            return Ok(Duration::ZERO);
        }
        if self.refill_rate == 0.0 || cost > self.capacity {
            return Err(FloodgateError::Unbounded);
        }
        // A rate small enough to overflow the Duration range means the
        // credits will not accrue in any caller's lifetime.
        Duration::try_from_secs_f64((cost - self.available) / self.refill_rate)
            .map_err(|_| FloodgateError::Unbounded)
    }

    /// Replace capacity and rate.
    ///
    /// Credits are settled under the old rate first so the elapsed interval
    /// is never re-priced at the new rate, then the balance is clamped to
    /// the new capacity.
    pub(crate) fn reconfigure(&mut self, capacity: f64, refill_rate: f64, now: Instant) {
        self.refill(now);
        self.capacity = capacity;
        self.refill_rate = refill_rate;
        self.available = self.available.min(capacity);
    }

    pub(crate) fn capacity(&self) -> f64 {
        self.capacity
    }

    pub(crate) fn refill_rate(&self) -> f64 {
        self.refill_rate
    }

    pub(crate) fn available(&self) -> f64 {
        self.available
    }
}
