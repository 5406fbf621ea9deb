// src/ingest/scheduler.rs
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::pipeline::Pipeline;

#[derive(Clone, Copy, Debug)]
pub struct PollSchedulerCfg {
    pub interval_secs: u64,
}

/// Run cycles back to back on a fixed interval until `shutdown` resolves.
/// Cycles run inline on this task, so a slow cycle delays the next tick
/// instead of overlapping it. Returns the number of cycles started.
pub async fn run_until<S>(pipeline: &mut Pipeline, interval: Duration, shutdown: S) -> u64
where
    S: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut cycles = 0u64;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!(cycles, "scheduler stopping");
                return cycles;
            }
            _ = ticker.tick() => {}
        }

        cycles += 1;
        // Failures are logged/reported inside the pipeline; the next tick retries.
        let _ = pipeline.run_cycle().await;
    }
}

/// `run_until` with Ctrl-C as the stop signal.
pub async fn run_forever(pipeline: &mut Pipeline, cfg: PollSchedulerCfg) -> u64 {
    let interval = Duration::from_secs(cfg.interval_secs.max(1));
    tracing::info!(interval_secs = interval.as_secs(), "polling");
    run_until(pipeline, interval, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "ctrl-c handler unavailable; running until killed");
            std::future::pending::<()>().await;
        }
    })
    .await
}
