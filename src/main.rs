//! notice-watch binary entrypoint.
//! Reads configuration from the environment, then runs one poll cycle, or
//! keeps polling when `POLL_INTERVAL_SECS` is set.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use notice_watch::config::{AppConfig, LogFormat};
use notice_watch::ingest::scheduler::{self, PollSchedulerCfg};
use notice_watch::notify::{format_startup, notify_best_effort, Notifier, TelegramNotifier};
use notice_watch::{render, telemetry, Ledger, Pipeline};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Compact => registry.with(fmt::layer().compact()).init(),
    }
}

/// Everything that must succeed before the first cycle. Errors here are fatal.
async fn startup(cfg: &AppConfig) -> anyhow::Result<(Pipeline, Arc<dyn Notifier>)> {
    if let Some(addr) = cfg.metrics_addr {
        telemetry::install_exporter(addr)?;
    }

    let ledger = Ledger::load(&cfg.ledger_path)
        .await
        .with_context(|| format!("loading ledger {}", cfg.ledger_path.display()))?;
    tracing::info!(path = %cfg.ledger_path.display(), entries = ledger.len(), "ledger ready");

    let renderer = render::build_renderer(cfg)
        .await
        .context("starting page renderer")?;
    tracing::info!(renderer = renderer.name(), "renderer ready");

    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::from_config(cfg));
    let pipeline = Pipeline::new(cfg, renderer, Arc::clone(&notifier), ledger);
    Ok((pipeline, notifier))
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let cfg = AppConfig::from_env();
    // A bad config still gets logged, in the default format.
    init_tracing(
        cfg.as_ref()
            .map(|c| c.log_format)
            .unwrap_or(LogFormat::Compact),
    );

    let cfg = match cfg {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "configuration error");
            return ExitCode::FAILURE;
        }
    };

    let (mut pipeline, notifier) = match startup(&cfg).await {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "startup failed");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        url = %cfg.notice_url,
        server = %cfg.server_name,
        category = %cfg.category_name,
        keyword = %cfg.filter.keyword,
        required_tags = ?cfg.filter.required_tags,
        "=== notice-watch start ==="
    );
    if cfg.notify_on_start {
        notify_best_effort(notifier.as_ref(), &format_startup(pipeline.context())).await;
    }

    if cfg.poll_interval_secs == 0 {
        // Aborted cycles are logged and reported; they are not a startup failure.
        let _ = pipeline.run_cycle().await;
    } else {
        scheduler::run_forever(
            &mut pipeline,
            PollSchedulerCfg {
                interval_secs: cfg.poll_interval_secs,
            },
        )
        .await;
    }

    tracing::info!("=== notice-watch end ===");
    ExitCode::SUCCESS
}
