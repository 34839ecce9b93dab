//! Background control loop that retunes a limiter at runtime.

mod sampler;
mod strategy;

pub use sampler::{LatencySampler, SamplerError, SimulatedSampler};
pub use strategy::{
    AdaptiveStrategy, AdjustmentStrategy, FixedStrategy, RateTarget, ScheduledStrategy,
    StrategyError,
};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, trace, warn};

use crate::limiter::Limiter;

/// Handle to a spawned rate controller task.
///
/// The loop sleeps on its interval timer between ticks and computes and
/// applies at most one adjustment per tick, synchronously, before waiting
/// for the next one. Dropping the handle detaches the loop; call
/// [`shutdown`](RateController::shutdown) to stop it.
pub struct RateController {
    task: JoinHandle<()>,
    shutdown: watch::Sender<bool>,
}

impl RateController {
    /// Spawn the periodic control loop driving `limiter`.
    pub fn spawn(
        limiter: Arc<Limiter>,
        mut strategy: Box<dyn AdjustmentStrategy>,
        interval: Duration,
    ) -> Self {
        let (shutdown, mut stopped) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // A tick delayed by a slow adjustment shifts the schedule
            // instead of bursting to catch up.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval completes immediately;
            // consume it so adjustments start one full interval in.
            ticker.tick().await;

            info!(
                strategy = strategy.name(),
                interval_ms = interval.as_millis() as u64,
                "Rate controller started"
            );

            loop {
                tokio::select! {
                    _ = stopped.changed() => break,
                    _ = ticker.tick() => apply_tick(&limiter, strategy.as_mut()).await,
                }
            }

            info!(strategy = strategy.name(), "Rate controller stopped");
        });

        Self { task, shutdown }
    }

    /// Stop the control loop and wait for the task to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Compute and apply one adjustment. Failures skip the tick; they never
/// take the loop down.
async fn apply_tick(limiter: &Limiter, strategy: &mut dyn AdjustmentStrategy) {
    match strategy.next_target().await {
        Ok(Some(target)) => match limiter.reconfigure(target.capacity, target.rate) {
            Ok(()) => info!(
                strategy = strategy.name(),
                capacity = target.capacity,
                rate = target.rate,
                "Applied rate adjustment"
            ),
            Err(e) => warn!(
                strategy = strategy.name(),
                error = %e,
                "Computed target rejected by limiter"
            ),
        },
        Ok(None) => trace!(strategy = strategy.name(), "No adjustment this tick"),
        Err(e) => warn!(
            strategy = strategy.name(),
            error = %e,
            "Failed to compute target, skipping tick"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    /// Sampler whose reported latency can be swapped from the test body.
    struct SharedSampler {
        latency_ms: Arc<AtomicU64>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl LatencySampler for SharedSampler {
        async fn sample(&mut self) -> Result<Duration, SamplerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Duration::from_millis(self.latency_ms.load(Ordering::SeqCst)))
        }
    }

    struct FailingSampler;

    #[async_trait]
    impl LatencySampler for FailingSampler {
        async fn sample(&mut self) -> Result<Duration, SamplerError> {
            Err(SamplerError::Unavailable("probe offline".to_string()))
        }
    }

    fn adaptive_controller(
        limiter: &Arc<Limiter>,
        sampler: impl LatencySampler + 'static,
        interval: Duration,
    ) -> RateController {
        let strategy = AdaptiveStrategy::new(
            Box::new(sampler),
            Duration::from_millis(500),
            100.0,
            50.0,
            1.0,
        );
        RateController::spawn(Arc::clone(limiter), Box::new(strategy), interval)
    }

    #[tokio::test(start_paused = true)]
    async fn adaptive_loop_degrades_and_recovers() {
        let limiter = Arc::new(Limiter::new(1.0, 100.0).unwrap());
        let latency_ms = Arc::new(AtomicU64::new(600));
        let sampler = SharedSampler {
            latency_ms: Arc::clone(&latency_ms),
            calls: Arc::new(AtomicUsize::new(0)),
        };
        let controller = adaptive_controller(&limiter, sampler, Duration::from_secs(3));

        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(limiter.snapshot().refill_rate, 50.0);

        latency_ms.store(100, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(limiter.snapshot().refill_rate, 100.0);

        controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn fixed_loop_never_reconfigures() {
        let limiter = Arc::new(Limiter::new(5.0, 10.0).unwrap());
        let controller = RateController::spawn(
            Arc::clone(&limiter),
            Box::new(FixedStrategy),
            Duration::from_secs(1),
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        let snapshot = limiter.snapshot();
        assert_eq!(snapshot.capacity, 5.0);
        assert_eq!(snapshot.refill_rate, 10.0);

        controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_loop_applies_bounded_targets() {
        let limiter = Arc::new(Limiter::new(5.0, 10.0).unwrap());
        let controller = RateController::spawn(
            Arc::clone(&limiter),
            Box::new(ScheduledStrategy::new(10.0, 60.0)),
            Duration::from_secs(1),
        );

        tokio::time::sleep(Duration::from_millis(1100)).await;
        let snapshot = limiter.snapshot();
        assert!(snapshot.refill_rate >= 10.0 && snapshot.refill_rate < 60.0);
        assert_eq!(snapshot.capacity, snapshot.refill_rate.ceil());

        controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn sampler_failure_skips_tick_but_loop_survives() {
        let limiter = Arc::new(Limiter::new(1.0, 100.0).unwrap());
        let controller = adaptive_controller(&limiter, FailingSampler, Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(2500)).await;
        // Two failed ticks later the limiter is untouched.
        assert_eq!(limiter.snapshot().refill_rate, 100.0);

        // And the loop is still alive: a shutdown completes cleanly.
        controller.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_the_ticking() {
        let limiter = Arc::new(Limiter::new(1.0, 100.0).unwrap());
        let calls = Arc::new(AtomicUsize::new(0));
        let sampler = SharedSampler {
            latency_ms: Arc::new(AtomicU64::new(100)),
            calls: Arc::clone(&calls),
        };
        let controller = adaptive_controller(&limiter, sampler, Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(calls.load(Ordering::SeqCst) >= 1);

        controller.shutdown().await;
        let calls_at_shutdown = calls.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(calls.load(Ordering::SeqCst), calls_at_shutdown);
    }
}
