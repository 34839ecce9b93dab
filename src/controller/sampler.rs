//! Latency feedback for the adaptive strategy.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use thiserror::Error;

/// Errors that can occur while sampling latency.
#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("latency sample unavailable: {0}")]
    Unavailable(String),
}

/// Source of recent response-time observations.
///
/// The adaptive strategy treats this as an opaque oracle: it asks for the
/// most recent or representative observed response time and compares it
/// against a threshold. Whether the number comes from real measurement or a
/// simulation is the implementor's concern.
#[async_trait]
pub trait LatencySampler: Send {
    /// Return a recent or representative observed response time.
    async fn sample(&mut self) -> Result<Duration, SamplerError>;
}

/// Simulated sampler for demos and tests: two out of three samples report
/// the slow value, the rest the fast value.
pub struct SimulatedSampler {
    slow: Duration,
    fast: Duration,
}

impl SimulatedSampler {
    pub fn new(slow: Duration, fast: Duration) -> Self {
        Self { slow, fast }
    }
}

impl Default for SimulatedSampler {
    fn default() -> Self {
        Self::new(Duration::from_millis(600), Duration::from_millis(100))
    }
}

#[async_trait]
impl LatencySampler for SimulatedSampler {
    async fn sample(&mut self) -> Result<Duration, SamplerError> {
        let slow = rand::thread_rng().gen_range(0..3) < 2;
        Ok(if slow { self.slow } else { self.fast })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulated_sampler_draws_from_both_values() {
        let mut sampler = SimulatedSampler::default();

        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(sampler.sample().await.unwrap());
        }

        assert!(seen.contains(&Duration::from_millis(600)));
        assert!(seen.contains(&Duration::from_millis(100)));
        assert_eq!(seen.len(), 2);
    }
}
