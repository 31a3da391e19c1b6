use std::path::PathBuf;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use serde::Serialize;

use crate::store::{LedgerMode, LedgerPaths};
use crate::util::time::parse_window;

use super::ScanCmd;

pub const SUBSCRIPTIONS_FILE: &str = "subscriptions.json";
pub const PROCESSED_FILE: &str = "processed_channels.txt";
pub const INACTIVE_FILE: &str = "inactive_channels.txt";
pub const ERRORS_FILE: &str = "error_channels.txt";

// Safe margin under the provider's 10k daily units.
pub const DEFAULT_QUOTA_BUDGET: u64 = 9_500;
const DEFAULT_INACTIVE_DAYS: i64 = 365;
const DEFAULT_COOLDOWN_MS: u64 = 1_000;
const DEFAULT_SHORTS_MAX_SECS: u64 = 60;

/// What a probe failure does to the rest of the run.
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the channel to the error file and move on; it stays unprocessed.
    #[default]
    Continue,
    /// Log the channel, then stop the scan (progress so far is still saved).
    Abort,
}

#[derive(Clone, Debug)]
pub struct ScanConfig {
    pub data_dir: PathBuf,
    pub token_file: PathBuf,
    pub client_secret_file: PathBuf,
    pub quota_budget: u64,
    pub inactive_after: ChronoDuration,
    pub cooldown: Duration,
    pub detect_shorts: bool,
    pub shorts_max: Duration,
    pub on_error: FailurePolicy,
    pub ledger_mode: LedgerMode,
    pub refresh_subscriptions: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            token_file: PathBuf::from("token.json"),
            client_secret_file: PathBuf::from("client_secret.json"),
            quota_budget: DEFAULT_QUOTA_BUDGET,
            inactive_after: ChronoDuration::days(DEFAULT_INACTIVE_DAYS),
            cooldown: Duration::from_millis(DEFAULT_COOLDOWN_MS),
            detect_shorts: false,
            shorts_max: Duration::from_secs(DEFAULT_SHORTS_MAX_SECS),
            on_error: FailurePolicy::Continue,
            ledger_mode: LedgerMode::Overwrite,
            refresh_subscriptions: false,
        }
    }
}

impl ScanConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    // Malformed values keep the default.
    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(dir) = get("SUBAUDIT_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Some(p) = get("SUBAUDIT_TOKEN_FILE") {
            cfg.token_file = PathBuf::from(p);
        }
        if let Some(p) = get("SUBAUDIT_CLIENT_SECRET") {
            cfg.client_secret_file = PathBuf::from(p);
        }
        if let Some(n) = get("SUBAUDIT_QUOTA_BUDGET").and_then(|v| v.trim().parse().ok()) {
            cfg.quota_budget = n;
        }
        if let Some(w) = get("SUBAUDIT_INACTIVE_AFTER").and_then(|v| parse_window(&v)) {
            cfg.inactive_after = w;
        }
        if let Some(ms) = get("SUBAUDIT_COOLDOWN_MS").and_then(|v| v.trim().parse().ok()) {
            cfg.cooldown = Duration::from_millis(ms);
        }
        if let Some(v) = get("SUBAUDIT_DETECT_SHORTS") {
            cfg.detect_shorts = matches!(v.trim(), "1" | "true" | "TRUE" | "yes" | "YES");
        }
        if let Some(p) = get("SUBAUDIT_ON_ERROR").and_then(|v| parse_value_enum::<FailurePolicy>(&v)) {
            cfg.on_error = p;
        }
        if let Some(m) = get("SUBAUDIT_LEDGER_MODE").and_then(|v| parse_value_enum::<LedgerMode>(&v)) {
            cfg.ledger_mode = m;
        }
        cfg
    }

    /// CLI flags win over env and defaults.
    pub fn apply_args(mut self, args: &ScanCmd) -> Self {
        if let Some(dir) = &args.data_dir { self.data_dir = dir.clone(); }
        if let Some(p) = &args.token_file { self.token_file = p.clone(); }
        if let Some(p) = &args.client_secret { self.client_secret_file = p.clone(); }
        if let Some(n) = args.budget { self.quota_budget = n; }
        if let Some(w) = args.inactive_after { self.inactive_after = w; }
        if let Some(ms) = args.cooldown_ms { self.cooldown = Duration::from_millis(ms); }
        if args.detect_shorts { self.detect_shorts = true; }
        if let Some(p) = args.on_error { self.on_error = p; }
        if let Some(m) = args.ledger_mode { self.ledger_mode = m; }
        if args.refresh_subscriptions { self.refresh_subscriptions = true; }
        self
    }

    pub fn subscriptions_path(&self) -> PathBuf {
        self.data_dir.join(SUBSCRIPTIONS_FILE)
    }

    pub fn ledger_paths(&self) -> LedgerPaths {
        LedgerPaths {
            processed: self.data_dir.join(PROCESSED_FILE),
            inactive: self.data_dir.join(INACTIVE_FILE),
            errors: self.data_dir.join(ERRORS_FILE),
        }
    }
}

fn parse_value_enum<E: clap::ValueEnum>(s: &str) -> Option<E> {
    E::from_str(s.trim(), true).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = ScanConfig::default();
        assert_eq!(cfg.quota_budget, 9_500);
        assert_eq!(cfg.inactive_after, ChronoDuration::days(365));
        assert_eq!(cfg.cooldown, Duration::from_secs(1));
        assert_eq!(cfg.on_error, FailurePolicy::Continue);
        assert_eq!(cfg.ledger_mode, LedgerMode::Overwrite);
        assert_eq!(cfg.ledger_paths().processed, PathBuf::from("./processed_channels.txt"));
    }

    #[test]
    fn env_overrides_and_ignores_malformed() {
        let cfg = ScanConfig::from_lookup(lookup(&[
            ("SUBAUDIT_DATA_DIR", "/var/lib/subaudit"),
            ("SUBAUDIT_QUOTA_BUDGET", "not-a-number"),
            ("SUBAUDIT_INACTIVE_AFTER", "26w"),
            ("SUBAUDIT_COOLDOWN_MS", "250"),
            ("SUBAUDIT_ON_ERROR", "Abort"),
            ("SUBAUDIT_LEDGER_MODE", "append"),
            ("SUBAUDIT_DETECT_SHORTS", "yes"),
        ]));
        assert_eq!(cfg.quota_budget, DEFAULT_QUOTA_BUDGET);
        assert_eq!(cfg.inactive_after, ChronoDuration::weeks(26));
        assert_eq!(cfg.cooldown, Duration::from_millis(250));
        assert_eq!(cfg.on_error, FailurePolicy::Abort);
        assert_eq!(cfg.ledger_mode, LedgerMode::Append);
        assert!(cfg.detect_shorts);
        assert_eq!(cfg.subscriptions_path(), PathBuf::from("/var/lib/subaudit/subscriptions.json"));
    }
}
