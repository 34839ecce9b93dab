//! Rate adjustment strategies for the controller loop.
//!
//! The three strategies share one "compute the next target" capability so
//! the reconfiguration contract lives in a single place: the controller
//! loop applies whatever target a strategy produces, and a strategy that
//! produces nothing leaves the limiter alone.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;

use super::sampler::{LatencySampler, SamplerError};

/// Errors that can occur while computing the next target.
#[derive(Debug, Error)]
pub enum StrategyError {
    #[error(transparent)]
    Sampler(#[from] SamplerError),
}

/// A new (capacity, rate) pair for the limiter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateTarget {
    /// Burst capacity in credits.
    pub capacity: f64,
    /// Refill rate in credits per second.
    pub rate: f64,
}

/// Computes the limiter target for each controller tick.
#[async_trait]
pub trait AdjustmentStrategy: Send {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Compute the target for this tick, or `None` to leave the limiter
    /// as it is.
    async fn next_target(&mut self) -> Result<Option<RateTarget>, StrategyError>;
}

/// Leaves the limiter at its construction-time settings.
pub struct FixedStrategy;

#[async_trait]
impl AdjustmentStrategy for FixedStrategy {
    fn name(&self) -> &'static str {
        "fixed"
    }

    async fn next_target(&mut self) -> Result<Option<RateTarget>, StrategyError> {
        Ok(None)
    }
}

/// Perturbs the rate within a bounded pseudo-random range on every tick.
///
/// The burst capacity follows the drawn rate, rounded up so a fractional
/// rate still admits whole requests.
pub struct ScheduledStrategy {
    min_adjust: f64,
    max_adjust: f64,
}

impl ScheduledStrategy {
    pub fn new(min_adjust: f64, max_adjust: f64) -> Self {
        Self {
            min_adjust,
            max_adjust,
        }
    }

    /// A degenerate range (inverted, empty, or with a zero bound) falls
    /// back to the upper bound rather than feeding an invalid range to the
    /// RNG.
    fn draw(&self) -> f64 {
        if self.min_adjust >= self.max_adjust || self.min_adjust == 0.0 || self.max_adjust == 0.0 {
            return self.max_adjust;
        }
        rand::thread_rng().gen_range(self.min_adjust..self.max_adjust)
    }
}

#[async_trait]
impl AdjustmentStrategy for ScheduledStrategy {
    fn name(&self) -> &'static str {
        "scheduled"
    }

    async fn next_target(&mut self) -> Result<Option<RateTarget>, StrategyError> {
        let rate = self.draw();
        Ok(Some(RateTarget {
            capacity: rate.ceil(),
            rate,
        }))
    }
}

/// Degrades the rate while observed latency sits above a threshold and
/// restores the nominal rate once it recovers.
pub struct AdaptiveStrategy {
    sampler: Box<dyn LatencySampler>,
    latency_threshold: Duration,
    nominal_rate: f64,
    degraded_rate: f64,
    /// Held constant across adjustments; a capacity of one disables
    /// bursting entirely.
    capacity: f64,
}

impl AdaptiveStrategy {
    pub fn new(
        sampler: Box<dyn LatencySampler>,
        latency_threshold: Duration,
        nominal_rate: f64,
        degraded_rate: f64,
        capacity: f64,
    ) -> Self {
        Self {
            sampler,
            latency_threshold,
            nominal_rate,
            degraded_rate,
            capacity,
        }
    }
}

#[async_trait]
impl AdjustmentStrategy for AdaptiveStrategy {
    fn name(&self) -> &'static str {
        "adaptive"
    }

    async fn next_target(&mut self) -> Result<Option<RateTarget>, StrategyError> {
        let latency = self.sampler.sample().await?;
        let rate = if latency > self.latency_threshold {
            self.degraded_rate
        } else {
            self.nominal_rate
        };
        Ok(Some(RateTarget {
            capacity: self.capacity,
            rate,
        }))
    }
}
