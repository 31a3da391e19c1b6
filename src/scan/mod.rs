use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Result};
use clap::Args;
use chrono::Duration as ChronoDuration;
use tokio_util::sync::CancellationToken;

use crate::output::types::Meta;
use crate::store::{LedgerMode, ProgressLedger, SubscriptionStore};
use crate::telemetry::{self};
use crate::telemetry::ops::scan::Phase as ScanPhase;
use crate::util::time::parse_window_arg;
use crate::youtube::auth::{AuthProvider, OAuthTokenFile, StaticToken};
use crate::youtube::client::YoutubeClientConfig;
use crate::youtube::Subscription;

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod probe;
pub mod quota;
pub mod types;

pub use config::{FailurePolicy, ScanConfig};
pub use error::ScanError;
pub use orchestrator::ScanOrchestrator;

#[derive(Args, Debug, Default)]
pub struct ScanCmd {
    /// Directory holding the snapshot, ledger and logs
    #[arg(long)] pub data_dir: Option<PathBuf>,
    #[arg(long)] pub token_file: Option<PathBuf>,
    #[arg(long)] pub client_secret: Option<PathBuf>,
    /// Request units this run may spend
    #[arg(long)] pub budget: Option<u64>,
    /// Flag channels whose newest upload is older than this ("365d", "52w", or days)
    #[arg(long, value_parser = parse_window_arg)] pub inactive_after: Option<ChronoDuration>,
    #[arg(long)] pub cooldown_ms: Option<u64>,
    /// Spend one extra unit per channel to label short-form uploads
    #[arg(long, default_value_t = false)] pub detect_shorts: bool,
    #[arg(long, value_enum)] pub on_error: Option<FailurePolicy>,
    #[arg(long, value_enum)] pub ledger_mode: Option<LedgerMode>,
    /// Ignore the cached snapshot and page through the subscription list again
    #[arg(long, default_value_t = false)] pub refresh_subscriptions: bool,
    #[arg(long, default_value_t = false)] pub apply: bool,
    #[arg(long, default_value_t = 10)] pub plan_limit: usize,
}

pub async fn run(args: ScanCmd) -> Result<()> {
    let log = telemetry::scan();
    let cfg = ScanConfig::from_env().apply_args(&args);
    let _g = log.root_span_kv([
        ("run_id", telemetry::config::run_id().to_string()),
        ("apply", args.apply.to_string()),
        ("data_dir", cfg.data_dir.display().to_string()),
        ("budget", cfg.quota_budget.to_string()),
        ("inactive_after_days", cfg.inactive_after.num_days().to_string()),
        ("on_error", format!("{:?}", cfg.on_error)),
        ("ledger_mode", format!("{:?}", cfg.ledger_mode)),
        ("detect_shorts", cfg.detect_shorts.to_string()),
    ]).entered();

    if !args.apply {
        let _sp = log.span(&ScanPhase::Plan).entered();
        return plan(&cfg, args.plan_limit);
    }

    let t0 = Instant::now();
    log.info("Authenticating...");
    let client_cfg = YoutubeClientConfig::from_env();
    let auth: Box<dyn AuthProvider> = match std::env::var("SUBAUDIT_ACCESS_TOKEN") {
        Ok(token) => Box::new(StaticToken { token, cfg: client_cfg }),
        Err(_) => Box::new(OAuthTokenFile::new(&cfg.token_file, &cfg.client_secret_file, client_cfg)),
    };
    let client = auth.get_client().await.map_err(ScanError::Auth)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; finishing current step and saving progress");
            on_signal.cancel();
        }
    });

    let report = ScanOrchestrator::new(&cfg, &client).with_cancel(cancel).run().await?;

    let meta = Meta { duration_ms: Some(t0.elapsed().as_millis()), data_dir: Some(cfg.data_dir.display().to_string()) };
    log.result(&report, Some(meta))?;

    if let types::ScanOutcome::Aborted { channel_id, reason } = &report.outcome {
        bail!("scan aborted at channel {channel_id}: {reason}");
    }
    Ok(())
}

// Local state only: no credentials, no API calls.
fn plan(cfg: &ScanConfig, plan_limit: usize) -> Result<()> {
    let log = telemetry::scan();
    let store = SubscriptionStore::new(cfg.subscriptions_path(), cfg.cooldown);
    let subs = store.load().map_err(ScanError::Snapshot)?;
    let processed = ProgressLedger::load_processed(&cfg.ledger_paths().processed).map_err(ScanError::Ledger)?;
    let plan = build_plan(cfg, &subs, &processed, plan_limit);

    if !telemetry::config::json_mode() {
        match (plan.subscriptions, plan.remaining) {
            (Some(total), Some(n)) => log.info(format!(
                "📝 Scan plan: subscriptions={} processed={} remaining={} budget={}",
                total, plan.processed, n, plan.quota_budget
            )),
            _ => log.info(format!(
                "📝 Scan plan: subscription list will be fetched first; processed={} budget={}",
                plan.processed, plan.quota_budget
            )),
        }
        for s in &plan.next_channels { log.info(format!("  {} ({})", s.title, s.channel_id)); }
        if let Some(n) = plan.remaining.filter(|n| *n > plan_limit) {
            log.info(format!("  ... ({} more)", n - plan_limit));
        }
        log.info("   Use --apply to execute.");
    }
    log.plan(&plan)
}

// With no usable snapshot (missing, or about to be refetched) nothing is known about the
// list, so counts and samples are left empty.
fn build_plan(cfg: &ScanConfig, subs: &[Subscription], processed: &HashSet<String>, plan_limit: usize) -> types::ScanPlan {
    use types::{ChannelSample, ScanPlan};

    let known = !subs.is_empty() && !cfg.refresh_subscriptions;
    let pending: Vec<&Subscription> = if known {
        subs.iter().filter(|s| !processed.contains(&s.channel_id)).collect()
    } else {
        Vec::new()
    };

    ScanPlan {
        subscriptions: known.then_some(subs.len()),
        processed: processed.len(),
        remaining: known.then_some(pending.len()),
        quota_budget: cfg.quota_budget,
        inactive_after_days: cfg.inactive_after.num_days(),
        on_error: format!("{:?}", cfg.on_error).to_lowercase(),
        ledger_mode: format!("{:?}", cfg.ledger_mode).to_lowercase(),
        next_channels: pending
            .iter()
            .take(plan_limit)
            .map(|s| ChannelSample { channel_id: s.channel_id.clone(), title: s.channel_title.clone() })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subs(ids: &[&str]) -> Vec<Subscription> {
        ids.iter().map(|id| Subscription::new(*id, format!("Title {id}"))).collect()
    }

    #[test]
    fn plan_samples_unprocessed_channels_from_the_snapshot() {
        let cfg = ScanConfig::default();
        let processed = HashSet::from(["B".to_string()]);
        let plan = build_plan(&cfg, &subs(&["A", "B", "C", "D"]), &processed, 2);
        assert_eq!((plan.subscriptions, plan.remaining), (Some(4), Some(3)));
        let ids: Vec<_> = plan.next_channels.iter().map(|s| s.channel_id.as_str()).collect();
        assert_eq!(ids, ["A", "C"]);
        assert_eq!(plan.on_error, "continue");
    }

    #[test]
    fn refresh_plan_lists_nothing_from_the_stale_snapshot() {
        let cfg = ScanConfig { refresh_subscriptions: true, ..ScanConfig::default() };
        let plan = build_plan(&cfg, &subs(&["A", "B"]), &HashSet::new(), 10);
        assert_eq!((plan.subscriptions, plan.remaining), (None, None));
        assert!(plan.next_channels.is_empty());
    }

    #[test]
    fn plan_without_snapshot_is_empty() {
        let plan = build_plan(&ScanConfig::default(), &[], &HashSet::from(["X".to_string()]), 10);
        assert_eq!(plan.processed, 1);
        assert!(plan.remaining.is_none() && plan.next_channels.is_empty());
    }
}
