use serde::Serialize;

use crate::store::FlushSummary;

// Plan envelope types
#[derive(Serialize)]
pub struct ChannelSample { pub channel_id: String, pub title: String }

#[derive(Serialize)]
pub struct ScanPlan {
    /// None when no snapshot is cached yet; the apply run will fetch the list first.
    pub subscriptions: Option<usize>,
    pub processed: usize,
    pub remaining: Option<usize>,
    pub quota_budget: u64,
    pub inactive_after_days: i64,
    pub on_error: String,
    pub ledger_mode: String,
    pub next_channels: Vec<ChannelSample>,
}

// Apply/result envelope types
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// Every subscription is now in the processed set.
    Completed,
    /// Budget ran out (ours or the provider's) before full coverage.
    QuotaStopped,
    /// Cancelled from outside (Ctrl-C).
    Interrupted,
    /// A probe failed under the abort policy.
    Aborted { channel_id: String, reason: String },
}

impl ScanOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanOutcome::Completed => "completed",
            ScanOutcome::QuotaStopped => "quota_stopped",
            ScanOutcome::Interrupted => "interrupted",
            ScanOutcome::Aborted { .. } => "aborted",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub outcome: ScanOutcome,
    pub total_subscriptions: usize,
    pub already_processed: usize,
    pub probed: usize,
    pub active: usize,
    pub inactive: usize,
    pub errors: usize,
    pub shorts: usize,
    pub remaining: usize,
    pub quota_used: u64,
    pub quota_budget: u64,
    pub flush: FlushSummary,
}

impl ScanReport {
    pub fn new(total_subscriptions: usize, quota_budget: u64) -> Self {
        Self {
            outcome: ScanOutcome::Completed,
            total_subscriptions,
            already_processed: 0,
            probed: 0,
            active: 0,
            inactive: 0,
            errors: 0,
            shorts: 0,
            remaining: 0,
            quota_used: 0,
            quota_budget,
            flush: FlushSummary::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_serializes_with_state_tag() {
        let v = serde_json::to_value(ScanOutcome::Aborted { channel_id: "UC1".into(), reason: "boom".into() }).unwrap();
        assert_eq!(v["state"], "aborted");
        assert_eq!(v["channel_id"], "UC1");
        let v = serde_json::to_value(ScanOutcome::QuotaStopped).unwrap();
        assert_eq!(v["state"], "quota_stopped");
    }
}
