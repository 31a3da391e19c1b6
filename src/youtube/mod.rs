use std::time::Duration;

use async_trait::async_trait;

pub mod auth;
pub mod client;
pub mod duration;
pub mod error;
#[cfg(test)]
pub mod mock;
pub mod types;

pub use error::ApiError;
pub use types::{LatestVideo, Subscription, SubscriptionPage};

/// The three Data API capabilities the scan needs.
#[async_trait]
pub trait ActivityService: Send + Sync {
    async fn list_subscriptions(&self, page_token: Option<&str>) -> Result<SubscriptionPage, ApiError>;

    /// Newest upload on the channel, or None when the search comes back empty.
    async fn search_latest_video(&self, channel_id: &str) -> Result<Option<LatestVideo>, ApiError>;

    async fn video_duration(&self, video_id: &str) -> Result<Option<Duration>, ApiError>;
}
