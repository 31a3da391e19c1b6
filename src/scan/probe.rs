use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};

use crate::youtube::{ActivityService, ApiError, LatestVideo};

/// Units charged for the latest-upload search.
pub const SEARCH_COST: u64 = 1;
/// Units charged for the optional duration lookup.
pub const VIDEO_COST: u64 = 1;

/// Minimum calls needed to decide a channel's activity, each followed by the cooldown.
pub struct ActivityProbe<'a> {
    svc: &'a dyn ActivityService,
    cooldown: Duration,
}

impl<'a> ActivityProbe<'a> {
    pub fn new(svc: &'a dyn ActivityService, cooldown: Duration) -> Self {
        Self { svc, cooldown }
    }

    pub async fn last_activity(&self, channel_id: &str) -> Result<Option<LatestVideo>, ApiError> {
        let res = self.svc.search_latest_video(channel_id).await;
        tokio::time::sleep(self.cooldown).await;
        res
    }

    pub async fn video_kind(&self, video_id: &str) -> Result<Option<Duration>, ApiError> {
        let res = self.svc.video_duration(video_id).await;
        tokio::time::sleep(self.cooldown).await;
        res
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Active { last_video: DateTime<Utc> },
    /// `last_video` is None when the channel has no visible uploads.
    Inactive { last_video: Option<DateTime<Utc>> },
}

/// Inactive when nothing was found or the newest upload is strictly older than `threshold`.
/// An upload exactly `threshold` old is still active.
pub fn classify(latest: Option<&LatestVideo>, now: DateTime<Utc>, threshold: ChronoDuration) -> Verdict {
    match latest {
        None => Verdict::Inactive { last_video: None },
        Some(v) if now - v.published_at > threshold => Verdict::Inactive { last_video: Some(v.published_at) },
        Some(v) => Verdict::Active { last_video: v.published_at },
    }
}

pub fn is_short_form(d: Duration, max: Duration) -> bool {
    d <= max
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(published_at: DateTime<Utc>) -> LatestVideo {
        LatestVideo { published_at, video_id: Some("v".into()) }
    }

    #[test]
    fn no_upload_is_inactive() {
        let now = Utc::now();
        assert_eq!(classify(None, now, ChronoDuration::days(365)), Verdict::Inactive { last_video: None });
    }

    #[test]
    fn threshold_boundary_is_active_one_second_past_is_inactive() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let t = ChronoDuration::days(365);

        let exact = now - t;
        assert_eq!(classify(Some(&at(exact)), now, t), Verdict::Active { last_video: exact });

        let inside = exact + ChronoDuration::seconds(1);
        assert!(matches!(classify(Some(&at(inside)), now, t), Verdict::Active { .. }));

        let outside = exact - ChronoDuration::seconds(1);
        assert_eq!(classify(Some(&at(outside)), now, t), Verdict::Inactive { last_video: Some(outside) });
    }

    #[test]
    fn future_timestamp_counts_as_active() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let later = now + ChronoDuration::hours(2);
        assert!(matches!(classify(Some(&at(later)), now, ChronoDuration::days(1)), Verdict::Active { .. }));
    }

    #[test]
    fn one_minute_is_short_form() {
        let max = Duration::from_secs(60);
        assert!(is_short_form(Duration::from_secs(60), max));
        assert!(!is_short_form(Duration::from_secs(61), max));
    }
}
