// src/pipeline.rs
//! One poll cycle: extract → filter → dedup-check → notify → record.
//!
//! Ordering is notify-then-record: a notice is only marked as sent after the
//! notifier reported success. A crash between the two re-sends it on the next
//! run (at-least-once).

use metrics::{counter, gauge};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::{CycleError, ExtractError};
use crate::filter::{matches, FilterConfig};
use crate::ingest::types::RawNotice;
use crate::ingest::{extract, ExtractPlan};
use crate::ledger::{fingerprint, FingerprintBasis, Ledger};
use crate::notify::{format_error, format_notice, notify_best_effort, NoticeContext, Notifier};
use crate::render::PageRenderer;
use crate::telemetry::ensure_metrics_described;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Extracting,
    Filtering,
    Delivering,
    /// The last cycle could not finish; the next one starts from scratch.
    Aborted,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub extracted: usize,
    pub matched: usize,
    pub duplicates: usize,
    pub delivered: usize,
    pub failed: usize,
}

pub struct Pipeline {
    renderer: Box<dyn PageRenderer>,
    notifier: Arc<dyn Notifier>,
    ledger: Ledger,
    plan: ExtractPlan,
    filter: FilterConfig,
    basis: FingerprintBasis,
    context: NoticeContext,
    phase: CyclePhase,
}

impl Pipeline {
    pub fn new(
        cfg: &AppConfig,
        renderer: Box<dyn PageRenderer>,
        notifier: Arc<dyn Notifier>,
        ledger: Ledger,
    ) -> Self {
        ensure_metrics_described();
        gauge!("notice_ledger_entries").set(ledger.len() as f64);
        Self {
            renderer,
            notifier,
            ledger,
            plan: ExtractPlan::from_config(cfg),
            filter: cfg.filter.clone(),
            basis: cfg.fingerprint_basis,
            context: NoticeContext::from_config(cfg),
            phase: CyclePhase::Idle,
        }
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn context(&self) -> &NoticeContext {
        &self.context
    }

    fn enter(&mut self, phase: CyclePhase) {
        tracing::trace!(from = ?self.phase, to = ?phase, "cycle phase");
        self.phase = phase;
    }

    /// Run one cycle. Taking `&mut self` keeps cycles from overlapping.
    pub async fn run_cycle(&mut self) -> Result<CycleReport, CycleError> {
        counter!("notice_cycles_total").increment(1);
        let mut report = CycleReport::default();

        self.enter(CyclePhase::Extracting);
        let notices = match self.extract_fresh().await {
            Ok(n) => n,
            Err(e) => {
                self.enter(CyclePhase::Aborted);
                counter!("notice_cycle_aborted_total", "kind" => e.kind()).increment(1);
                tracing::warn!(error = %e, kind = e.kind(), "cycle aborted during extraction");
                notify_best_effort(self.notifier.as_ref(), &format_error(&e)).await;
                return Err(e.into());
            }
        };
        report.extracted = notices.len();

        self.enter(CyclePhase::Filtering);
        let matched: Vec<RawNotice> = notices
            .into_iter()
            .filter(|n| matches(n, &self.filter))
            .collect();
        report.matched = matched.len();
        counter!("notice_matched_total").increment(matched.len() as u64);

        self.enter(CyclePhase::Delivering);
        for notice in &matched {
            let fp = fingerprint(notice, self.basis);
            if self.ledger.contains(&fp) {
                report.duplicates += 1;
                counter!("notice_duplicates_total").increment(1);
                tracing::debug!(fingerprint = %fp, "already delivered");
                continue;
            }

            let msg = format_notice(&self.context, notice);
            match self.notifier.send(&msg).await {
                Ok(()) => {
                    if let Err(e) = self.ledger.append(fp.clone()).await {
                        self.enter(CyclePhase::Aborted);
                        tracing::error!(
                            error = %e,
                            fingerprint = %fp,
                            path = %self.ledger.path().display(),
                            "delivered but could not record; aborting cycle"
                        );
                        let err = CycleError::Ledger(e);
                        notify_best_effort(self.notifier.as_ref(), &format_error(&err)).await;
                        return Err(err);
                    }
                    report.delivered += 1;
                    counter!("notice_delivered_total").increment(1);
                    tracing::info!(fingerprint = %fp, "notice delivered");
                }
                Err(e) => {
                    report.failed += 1;
                    counter!("notice_notify_failures_total").increment(1);
                    tracing::warn!(
                        error = %format!("{e:#}"),
                        fingerprint = %fp,
                        "notify failed; will retry next cycle"
                    );
                }
            }
        }

        self.enter(CyclePhase::Idle);
        gauge!("notice_last_cycle_ts").set(chrono::Utc::now().timestamp() as f64);
        gauge!("notice_ledger_entries").set(self.ledger.len() as f64);
        tracing::info!(
            extracted = report.extracted,
            matched = report.matched,
            duplicates = report.duplicates,
            delivered = report.delivered,
            failed = report.failed,
            "cycle finished"
        );
        Ok(report)
    }

    /// Fresh session per cycle: navigation always starts from a clean load.
    async fn extract_fresh(&self) -> Result<Vec<RawNotice>, ExtractError> {
        let mut session = self.renderer.new_session().await?;
        let result = extract(session.as_mut(), &self.plan).await;
        session.close().await;
        result
    }
}
