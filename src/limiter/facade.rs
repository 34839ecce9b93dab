//! Thread-safe admission facade over a single token bucket.

use std::future::Future;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::bucket::TokenBucket;
use crate::error::{FloodgateError, Result};

/// Point-in-time view of limiter state, for logging and inspection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterSnapshot {
    /// Maximum credits the bucket can bank.
    pub capacity: f64,
    /// Credits restored per second.
    pub refill_rate: f64,
    /// Current balance, settled as of the snapshot.
    pub available: f64,
}

/// Admission control over one exclusively owned token bucket.
///
/// Every bucket access (including reads) advances the refill clock, so all
/// access is serialized through one mutex; no decision ever observes a
/// partially updated bucket. The lock is never held across an await point.
///
/// This struct is thread-safe and can be shared across tasks behind an
/// `Arc`.
pub struct Limiter {
    bucket: Mutex<TokenBucket>,
}

impl Limiter {
    /// Create a limiter with the given burst capacity and refill rate
    /// (credits per second). The bucket starts full.
    pub fn new(capacity: f64, refill_rate: f64) -> Result<Self> {
        validate(capacity, refill_rate)?;
        Ok(Self {
            bucket: Mutex::new(TokenBucket::new(capacity, refill_rate, Instant::now())),
        })
    }

    /// Non-blocking admission check for a single unit of work.
    pub fn try_admit(&self) -> bool {
        self.try_admit_n(1)
    }

    /// Non-blocking admission check costing `cost` credits.
    ///
    /// Returns `false` when the balance does not cover the cost; the caller
    /// decides whether to drop, retry, or back off.
    pub fn try_admit_n(&self, cost: u32) -> bool {
        let admitted = self.bucket.lock().try_take(f64::from(cost), Instant::now());
        trace!(cost, admitted, "admission check");
        admitted
    }

    /// Wait until a single unit of work is admitted.
    pub async fn acquire(&self) -> Result<()> {
        self.acquire_n(1).await
    }

    /// Wait until `cost` credits are available and consume them.
    pub async fn acquire_n(&self, cost: u32) -> Result<()> {
        self.acquire_with_cancel(cost, std::future::pending::<()>())
            .await
    }

    /// Wait until `cost` credits are available, or until `cancel` resolves.
    ///
    /// The wait is recomputed from fresh bucket state after every wake, so a
    /// concurrent [`reconfigure`](Limiter::reconfigure) that shortens or
    /// lengthens the true wait is picked up on the next pass rather than
    /// trusted from a stale estimate.
    ///
    /// Cancellation is observed at each point the call would otherwise
    /// suspend; when the retry timer and `cancel` are both ready, the
    /// cancellation wins and no credit is consumed. Fails with
    /// [`FloodgateError::Unbounded`] instead of waiting forever when the
    /// credits can never accrue under the current configuration.
    pub async fn acquire_with_cancel(
        &self,
        cost: u32,
        cancel: impl Future<Output = ()>,
    ) -> Result<()> {
        tokio::pin!(cancel);
        loop {
            let wait = {
                let mut bucket = self.bucket.lock();
                let now = Instant::now();
                if bucket.try_take(f64::from(cost), now) {
                    return Ok(());
                }
                bucket.time_until_available(f64::from(cost), now)?
            };

            debug!(cost, wait_ms = wait.as_millis() as u64, "credits exhausted, waiting");

            tokio::select! {
                biased;
                _ = &mut cancel => return Err(FloodgateError::Cancelled),
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Atomically replace the bucket's capacity and refill rate.
    ///
    /// Safe to call concurrently with admission checks; an invalid
    /// configuration is rejected before any state changes.
    pub fn reconfigure(&self, capacity: f64, refill_rate: f64) -> Result<()> {
        validate(capacity, refill_rate)?;
        self.bucket
            .lock()
            .reconfigure(capacity, refill_rate, Instant::now());
        debug!(capacity, rate = refill_rate, "limiter reconfigured");
        Ok(())
    }

    /// Settle credits and report the current configuration and balance.
    pub fn snapshot(&self) -> LimiterSnapshot {
        let mut bucket = self.bucket.lock();
        bucket.refill(Instant::now());
        LimiterSnapshot {
            capacity: bucket.capacity(),
            refill_rate: bucket.refill_rate(),
            available: bucket.available(),
        }
    }
}

/// Negative or non-finite parameters are always invalid; a limiter with
/// zero capacity and zero rate could never admit anything, so that pair is
/// rejected as well. Zero capacity with a positive rate stays legal: it
/// admits nothing (every positive cost exceeds the capacity and fails
/// `Unbounded`), but a later reconfiguration can open the gate, so it is a
/// usable "closed for now" state rather than a construction mistake.
fn validate(capacity: f64, rate: f64) -> Result<()> {
    if !capacity.is_finite()
        || !rate.is_finite()
        || capacity < 0.0
        || rate < 0.0
        || (capacity == 0.0 && rate == 0.0)
    {
        return Err(FloodgateError::InvalidConfiguration { capacity, rate });
    }
    Ok(())
}
