//! Configuration management for Floodgate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration for a limiter and its controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FloodgateConfig {
    /// Limiter configuration
    #[serde(default)]
    pub limiter: LimiterConfig,

    /// Rate controller configuration
    #[serde(default)]
    pub controller: ControllerConfig,
}

impl Default for FloodgateConfig {
    fn default() -> Self {
        Self {
            limiter: LimiterConfig::default(),
            controller: ControllerConfig::default(),
        }
    }
}

/// Limiter construction parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Burst capacity in credits
    #[serde(default = "default_capacity")]
    pub capacity: f64,

    /// Refill rate in credits per second
    #[serde(default = "default_refill_rate")]
    pub refill_rate: f64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            refill_rate: default_refill_rate(),
        }
    }
}

fn default_capacity() -> f64 {
    5.0
}

fn default_refill_rate() -> f64 {
    10.0
}

/// Which adjustment strategy the controller runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Fixed,
    Scheduled,
    Adaptive,
}

impl Default for StrategyKind {
    fn default() -> Self {
        StrategyKind::Adaptive
    }
}

/// Rate controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Adjustment strategy
    #[serde(default)]
    pub strategy: StrategyKind,

    /// Seconds between adjustment ticks
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Scheduled strategy parameters
    #[serde(default)]
    pub scheduled: ScheduledConfig,

    /// Adaptive strategy parameters
    #[serde(default)]
    pub adaptive: AdaptiveConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            interval_secs: default_interval_secs(),
            scheduled: ScheduledConfig::default(),
            adaptive: AdaptiveConfig::default(),
        }
    }
}

impl ControllerConfig {
    /// The tick interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

fn default_interval_secs() -> u64 {
    3
}

/// Bounds for the scheduled strategy's random rate draw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledConfig {
    /// Lower bound of the rate range (inclusive)
    #[serde(default = "default_min_adjust")]
    pub min_adjust: f64,

    /// Upper bound of the rate range (exclusive)
    #[serde(default = "default_max_adjust")]
    pub max_adjust: f64,
}

impl Default for ScheduledConfig {
    fn default() -> Self {
        Self {
            min_adjust: default_min_adjust(),
            max_adjust: default_max_adjust(),
        }
    }
}

fn default_min_adjust() -> f64 {
    10.0
}

fn default_max_adjust() -> f64 {
    60.0
}

/// Thresholds and rates for the adaptive strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    /// Latency above this many milliseconds degrades the rate
    #[serde(default = "default_latency_threshold_ms")]
    pub latency_threshold_ms: u64,

    /// Rate while latency is healthy
    #[serde(default = "default_nominal_rate")]
    pub nominal_rate: f64,

    /// Rate while latency is over the threshold
    #[serde(default = "default_degraded_rate")]
    pub degraded_rate: f64,

    /// Burst capacity, held constant across adjustments
    #[serde(default = "default_adaptive_capacity")]
    pub capacity: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            latency_threshold_ms: default_latency_threshold_ms(),
            nominal_rate: default_nominal_rate(),
            degraded_rate: default_degraded_rate(),
            capacity: default_adaptive_capacity(),
        }
    }
}

impl AdaptiveConfig {
    /// The degradation threshold as a duration.
    pub fn latency_threshold(&self) -> Duration {
        Duration::from_millis(self.latency_threshold_ms)
    }
}

fn default_latency_threshold_ms() -> u64 {
    500
}

fn default_nominal_rate() -> f64 {
    100.0
}

fn default_degraded_rate() -> f64 {
    50.0
}

fn default_adaptive_capacity() -> f64 {
    1.0
}

impl FloodgateConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: &str) -> crate::error::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| crate::error::FloodgateError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_demo_profile() {
        let config = FloodgateConfig::default();
        assert_eq!(config.limiter.capacity, 5.0);
        assert_eq!(config.limiter.refill_rate, 10.0);
        assert_eq!(config.controller.strategy, StrategyKind::Adaptive);
        assert_eq!(config.controller.interval(), Duration::from_secs(3));
        assert_eq!(
            config.controller.adaptive.latency_threshold(),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let yaml = r#"
limiter:
  capacity: 20
controller:
  strategy: scheduled
  scheduled:
    max_adjust: 200
"#;
        let config = FloodgateConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.limiter.capacity, 20.0);
        assert_eq!(config.limiter.refill_rate, 10.0);
        assert_eq!(config.controller.strategy, StrategyKind::Scheduled);
        assert_eq!(config.controller.scheduled.min_adjust, 10.0);
        assert_eq!(config.controller.scheduled.max_adjust, 200.0);
    }

    #[test]
    fn invalid_yaml_is_a_config_error() {
        let result = FloodgateConfig::from_yaml("limiter: [not, a, map]");
        assert!(matches!(
            result,
            Err(crate::error::FloodgateError::Config(_))
        ));
    }
}
