use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber;

use floodgate::config::{FloodgateConfig, StrategyKind};
use floodgate::controller::{
    AdaptiveStrategy, AdjustmentStrategy, FixedStrategy, RateController, ScheduledStrategy,
    SimulatedSampler,
};
use floodgate::limiter::Limiter;

/// Demo workload driving a floodgate limiter.
#[derive(Parser, Debug)]
#[command(name = "floodgate", version)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Override the configured adjustment strategy
    #[arg(short, long, value_enum)]
    strategy: Option<StrategyKind>,

    /// Number of simulated workers
    #[arg(short, long, default_value_t = 4)]
    workers: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    info!("Starting Floodgate demo workload");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => FloodgateConfig::from_file(path)?,
        None => FloodgateConfig::default(),
    };
    if let Some(strategy) = args.strategy {
        config.controller.strategy = strategy;
    }
    info!(strategy = ?config.controller.strategy, "Configuration loaded");

    let limiter = Arc::new(Limiter::new(
        config.limiter.capacity,
        config.limiter.refill_rate,
    )?);

    let strategy: Box<dyn AdjustmentStrategy> = match config.controller.strategy {
        StrategyKind::Fixed => Box::new(FixedStrategy),
        StrategyKind::Scheduled => Box::new(ScheduledStrategy::new(
            config.controller.scheduled.min_adjust,
            config.controller.scheduled.max_adjust,
        )),
        StrategyKind::Adaptive => Box::new(AdaptiveStrategy::new(
            Box::new(SimulatedSampler::default()),
            config.controller.adaptive.latency_threshold(),
            config.controller.adaptive.nominal_rate,
            config.controller.adaptive.degraded_rate,
            config.controller.adaptive.capacity,
        )),
    };
    let controller = RateController::spawn(
        Arc::clone(&limiter),
        strategy,
        config.controller.interval(),
    );

    let mut workers = Vec::with_capacity(args.workers);
    for worker in 0..args.workers {
        let limiter = Arc::clone(&limiter);
        workers.push(tokio::spawn(async move {
            let mut processed: u64 = 0;
            loop {
                match limiter.acquire().await {
                    Ok(()) => {
                        processed += 1;
                        info!(worker, processed, "Request admitted");
                        // Simulated request handling time.
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                    Err(e) => {
                        warn!(worker, error = %e, "Admission wait failed, backing off");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }
        }));
    }

    signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down");

    for worker in &workers {
        worker.abort();
    }
    controller.shutdown().await;

    info!("Floodgate demo stopped");
    Ok(())
}
