use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::store::{ErrorRecord, InactiveRecord, LedgerGuard, ProgressLedger, SubscriptionStore};
use crate::telemetry::{self, ctx::LogCtx};
use crate::telemetry::ops::scan::{Phase as ScanPhase, Scan};
use crate::util::time::{format_age, rfc3339};
use crate::youtube::{ActivityService, LatestVideo, Subscription};

use super::config::{FailurePolicy, ScanConfig};
use super::error::ScanError;
use super::probe::{classify, is_short_form, ActivityProbe, Verdict, SEARCH_COST, VIDEO_COST};
use super::quota::QuotaGovernor;
use super::types::{ScanOutcome, ScanReport};

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Idle,
    FetchingList,
    Scanning,
    Completed,
    QuotaStopped,
    Interrupted,
    Aborted,
    Failed,
    Flushed,
}

impl ScanState {
    fn as_str(&self) -> &'static str {
        match self {
            ScanState::Idle => "idle",
            ScanState::FetchingList => "fetching_list",
            ScanState::Scanning => "scanning",
            ScanState::Completed => "completed",
            ScanState::QuotaStopped => "quota_stopped",
            ScanState::Interrupted => "interrupted",
            ScanState::Aborted => "aborted",
            ScanState::Failed => "failed",
            ScanState::Flushed => "flushed",
        }
    }

    fn from_outcome(o: &ScanOutcome) -> Self {
        match o {
            ScanOutcome::Completed => ScanState::Completed,
            ScanOutcome::QuotaStopped => ScanState::QuotaStopped,
            ScanOutcome::Interrupted => ScanState::Interrupted,
            ScanOutcome::Aborted { .. } => ScanState::Aborted,
        }
    }
}

/// Drives one resumable scan: resolve the list, probe unprocessed channels under the quota,
/// record verdicts, and flush the ledger on every exit path.
pub struct ScanOrchestrator<'a> {
    cfg: &'a ScanConfig,
    svc: &'a dyn ActivityService,
    cancel: CancellationToken,
    clock: Clock,
}

impl<'a> ScanOrchestrator<'a> {
    pub fn new(cfg: &'a ScanConfig, svc: &'a dyn ActivityService) -> Self {
        Self { cfg, svc, cancel: CancellationToken::new(), clock: Box::new(Utc::now) }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub async fn run(&self) -> Result<ScanReport, ScanError> {
        let log = telemetry::scan();
        let mut state = ScanState::Idle;

        let ledger = {
            let _s = log.span(&ScanPhase::LoadLedger).entered();
            ProgressLedger::open(self.cfg.ledger_paths(), self.cfg.ledger_mode).map_err(ScanError::Ledger)?
        };
        log.info(format!("Loaded {} processed channel(s) from the ledger", ledger.processed_count()));
        let mut ledger = LedgerGuard::new(ledger);

        let scanned = self.scan(&mut ledger, &log, &mut state).await;

        let next = match &scanned {
            Ok(report) => ScanState::from_outcome(&report.outcome),
            Err(_) => ScanState::Failed,
        };
        transition(&log, &mut state, next);

        let flushed = {
            let _s = log.span(&ScanPhase::Flush).entered();
            ledger.finish()
        };
        transition(&log, &mut state, ScanState::Flushed);

        match (scanned, flushed) {
            (Ok(mut report), Ok(summary)) => {
                report.flush = summary;
                log.info("Progress has been saved to files.");
                Ok(report)
            }
            (Ok(_), Err(e)) => Err(ScanError::Ledger(e)),
            (Err(e), Ok(_)) => {
                log.info("Progress has been saved to files.");
                Err(e)
            }
            (Err(e), Err(fe)) => {
                log.error_kv("saving progress failed", [("error", fe.to_string())]);
                Err(e)
            }
        }
    }

    async fn scan(&self, ledger: &mut LedgerGuard, log: &LogCtx<Scan>, state: &mut ScanState) -> Result<ScanReport, ScanError> {
        transition(log, state, ScanState::FetchingList);
        let subs = self.resolve_subscriptions(log).await?;

        transition(log, state, ScanState::Scanning);
        let mut governor = QuotaGovernor::new(self.cfg.quota_budget);
        let probe = ActivityProbe::new(self.svc, self.cfg.cooldown);
        let mut report = ScanReport::new(subs.len(), governor.budget());
        report.already_processed = subs.iter().filter(|s| ledger.is_processed(&s.channel_id)).count();

        for sub in &subs {
            // the list is not deduplicated; a repeated id is skipped once processed
            if ledger.is_processed(&sub.channel_id) { continue; }

            if self.cancel.is_cancelled() {
                report.outcome = ScanOutcome::Interrupted;
                break;
            }
            if !governor.try_consume(SEARCH_COST) {
                log.warn(format!(
                    "Approaching API quota limit ({} of {} units left). Stopping further requests.",
                    governor.remaining(), governor.budget()
                ));
                report.outcome = ScanOutcome::QuotaStopped;
                break;
            }

            log.info(format!("Checking channel: {} (ID: {})", sub.channel_title, sub.channel_id));
            let span = log.span_kv(&ScanPhase::Probe, [("channel_id", sub.channel_id.clone())]);
            let probed = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                r = probe.last_activity(&sub.channel_id).instrument(span) => Some(r),
            };
            let Some(result) = probed else {
                log.warn(format!("Interrupted while checking {}; it stays unprocessed", sub.channel_id));
                report.outcome = ScanOutcome::Interrupted;
                break;
            };
            report.probed += 1;

            match result {
                Ok(latest) => {
                    if self.cfg.detect_shorts {
                        self.label_short_form(&probe, &mut governor, sub, latest.as_ref(), &mut report, log).await;
                    }
                    self.record_verdict(ledger, sub, latest.as_ref(), &mut report, log);
                    ledger.record_processed(&sub.channel_id);
                }
                Err(e) if e.is_quota_exceeded() => {
                    log.warn_kv(
                        "Provider reports the quota is exhausted. Stopping further requests.",
                        [("channel_id", sub.channel_id.clone()), ("error", e.to_string())],
                    );
                    report.outcome = ScanOutcome::QuotaStopped;
                    break;
                }
                Err(e) => {
                    report.errors += 1;
                    log.error_kv(
                        &format!("Error processing channel {} (ID: {}): {}", sub.channel_title, sub.channel_id, e),
                        [("channel_id", sub.channel_id.clone()), ("error", e.to_string())],
                    );
                    ledger.record_error(ErrorRecord {
                        channel_title: sub.channel_title.clone(),
                        channel_id: sub.channel_id.clone(),
                        error: e.to_string(),
                    });
                    if self.cfg.on_error == FailurePolicy::Abort {
                        report.outcome = ScanOutcome::Aborted { channel_id: sub.channel_id.clone(), reason: e.to_string() };
                        break;
                    }
                }
            }
        }

        report.remaining = subs
            .iter()
            .map(|s| s.channel_id.as_str())
            .filter(|id| !ledger.is_processed(id))
            .collect::<HashSet<_>>()
            .len();
        report.quota_used = governor.consumed();
        log.totals(&report);
        Ok(report)
    }

    async fn resolve_subscriptions(&self, log: &LogCtx<Scan>) -> Result<Vec<Subscription>, ScanError> {
        let store = SubscriptionStore::new(self.cfg.subscriptions_path(), self.cfg.cooldown);
        if !self.cfg.refresh_subscriptions {
            let cached = store.load().map_err(ScanError::Snapshot)?;
            if !cached.is_empty() {
                log.info(format!("Loaded {} subscriptions from {}", cached.len(), store.path().display()));
                return Ok(cached);
            }
        }

        log.info("Fetching subscriptions...");
        let fresh = store
            .fetch_all(self.svc)
            .instrument(log.span(&ScanPhase::FetchList))
            .await
            .map_err(ScanError::ListFetch)?;
        store.save(&fresh).map_err(ScanError::Snapshot)?;
        log.info(format!("Fetched and cached {} subscriptions", fresh.len()));
        Ok(fresh)
    }

    fn record_verdict(
        &self,
        ledger: &mut LedgerGuard,
        sub: &Subscription,
        latest: Option<&LatestVideo>,
        report: &mut ScanReport,
        log: &LogCtx<Scan>,
    ) {
        let _s = log.span(&ScanPhase::Classify).entered();
        let now = (self.clock)();
        match classify(latest, now, self.cfg.inactive_after) {
            Verdict::Active { last_video } => {
                report.active += 1;
                log.info_kv(
                    &format!("Active: {} (last video {} ago)", sub.channel_title, format_age(now - last_video)),
                    [("channel_id", sub.channel_id.clone()), ("last_video", rfc3339(last_video))],
                );
            }
            Verdict::Inactive { last_video } => {
                report.inactive += 1;
                let detail = match last_video {
                    Some(ts) => format!("Last video: {}", rfc3339(ts)),
                    None => "No videos found".to_string(),
                };
                log.info_kv(
                    &format!("Unsubscribe from: {} ({})", sub.channel_title, detail),
                    [("channel_id", sub.channel_id.clone())],
                );
                ledger.record_inactive(InactiveRecord {
                    channel_id: sub.channel_id.clone(),
                    channel_title: sub.channel_title.clone(),
                    last_video,
                    discovered_at: now,
                });
            }
        }
    }

    // Informational only; never changes the verdict and never fails the channel.
    async fn label_short_form(
        &self,
        probe: &ActivityProbe<'_>,
        governor: &mut QuotaGovernor,
        sub: &Subscription,
        latest: Option<&LatestVideo>,
        report: &mut ScanReport,
        log: &LogCtx<Scan>,
    ) {
        let Some(video_id) = latest.and_then(|v| v.video_id.as_deref()) else { return };
        if !governor.try_consume(VIDEO_COST) {
            log.debug(format!("Skipping short-form check for {}: no quota left", sub.channel_id));
            return;
        }
        match probe.video_kind(video_id).await {
            Ok(Some(d)) if is_short_form(d, self.cfg.shorts_max) => {
                report.shorts += 1;
                log.info(format!("Channel {} mostly posts Shorts (latest upload {}s)", sub.channel_title, d.as_secs()));
            }
            Ok(_) => {}
            Err(e) => log.warn_kv("duration lookup failed", [("video_id", video_id.to_string()), ("error", e.to_string())]),
        }
    }
}

fn transition(log: &LogCtx<Scan>, state: &mut ScanState, next: ScanState) {
    log.state(state.as_str(), next.as_str());
    *state = next;
}
