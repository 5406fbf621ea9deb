// src/telemetry.rs
use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;

/// One-time metrics registration (so series show up on the first scrape).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("notice_cycles_total", "Poll cycles started.");
        describe_counter!(
            "notice_cycle_aborted_total",
            "Cycles abandoned because the notice list could not be read."
        );
        describe_counter!("notice_extracted_total", "Notice cards read from the page.");
        describe_counter!("notice_matched_total", "Notices passing the tag/keyword filter.");
        describe_counter!(
            "notice_duplicates_total",
            "Matched notices skipped because the ledger already has them."
        );
        describe_counter!("notice_delivered_total", "Notices delivered and recorded.");
        describe_counter!(
            "notice_notify_failures_total",
            "Delivery attempts that failed; retried next cycle."
        );
        describe_histogram!("notice_extract_ms", "Page open + navigation + read time in ms.");
        describe_gauge!("notice_last_cycle_ts", "Unix ts of the last finished cycle.");
        describe_gauge!("notice_ledger_entries", "Fingerprints held by the ledger.");
    });
}

/// Serve Prometheus text exposition on `addr` (`GET /metrics`).
pub fn install_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("prometheus: install exporter")?;
    ensure_metrics_described();
    tracing::info!(%addr, "metrics exporter listening");
    Ok(())
}
