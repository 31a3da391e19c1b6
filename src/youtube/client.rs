use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use url::Url;

use super::duration::parse_iso8601;
use super::error::ApiError;
use super::types::{
    ApiErrorEnvelope, ApiSearchList, ApiSubscriptionList, ApiVideoList, LatestVideo, SubscriptionPage,
};
use super::ActivityService;

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const MAX_PAGE_SIZE: u32 = 50;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct YoutubeClientConfig {
    pub base_url: String,
    pub page_size: u32,
    pub timeout: Duration,
}

impl Default for YoutubeClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            page_size: MAX_PAGE_SIZE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl YoutubeClientConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(base) = std::env::var("SUBAUDIT_API_BASE") {
            cfg.base_url = base;
        }
        if let Ok(timeout) = std::env::var("SUBAUDIT_HTTP_TIMEOUT_SECS") {
            if let Ok(parsed) = timeout.parse::<u64>() {
                cfg.timeout = Duration::from_secs(parsed);
            }
        }
        cfg
    }
}

/// Authorized handle on the YouTube Data API v3.
#[derive(Clone)]
pub struct YoutubeClient {
    http: HttpClient,
    cfg: YoutubeClientConfig,
    access_token: String,
}

impl YoutubeClient {
    pub fn new(cfg: YoutubeClientConfig, access_token: impl Into<String>) -> Result<Self, ApiError> {
        let http = HttpClient::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(ApiError::from_reqwest)?;
        Ok(Self { http, cfg, access_token: access_token.into() })
    }

    fn endpoint(&self, resource: &str, params: &[(&str, &str)]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!("{}/{}", self.cfg.base_url.trim_end_matches('/'), resource))?;
        url.query_pairs_mut().extend_pairs(params);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(ApiError::from_reqwest)?;

        if !status.is_success() {
            let body = serde_json::from_slice::<ApiErrorEnvelope>(&bytes)
                .map(|env| env.error)
                .unwrap_or_default();
            let reason = body.errors.into_iter().find_map(|e| e.reason);
            let message = if body.message.is_empty() { "unknown error".to_string() } else { body.message };
            return Err(ApiError::Api { status, reason, message });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ActivityService for YoutubeClient {
    async fn list_subscriptions(&self, page_token: Option<&str>) -> Result<SubscriptionPage, ApiError> {
        let page_size = self.cfg.page_size.clamp(1, MAX_PAGE_SIZE).to_string();
        let mut params = vec![("part", "snippet"), ("mine", "true"), ("maxResults", page_size.as_str())];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }
        let list: ApiSubscriptionList = self.get_json(self.endpoint("subscriptions", &params)?).await?;
        Ok(list.into())
    }

    async fn search_latest_video(&self, channel_id: &str) -> Result<Option<LatestVideo>, ApiError> {
        let url = self.endpoint(
            "search",
            &[
                ("part", "snippet"),
                ("channelId", channel_id),
                ("maxResults", "1"),
                ("order", "date"),
                ("type", "video"),
            ],
        )?;
        let list: ApiSearchList = self.get_json(url).await?;
        Ok(list.into_latest())
    }

    async fn video_duration(&self, video_id: &str) -> Result<Option<Duration>, ApiError> {
        let url = self.endpoint("videos", &[("part", "contentDetails"), ("id", video_id)])?;
        let list: ApiVideoList = self.get_json(url).await?;
        Ok(list
            .items
            .into_iter()
            .next()
            .and_then(|v| parse_iso8601(&v.content_details.duration)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> YoutubeClient {
        YoutubeClient::new(
            YoutubeClientConfig { base_url: "https://example.test/youtube/v3/".into(), ..Default::default() },
            "tok",
        )
        .unwrap()
    }

    #[test]
    fn endpoint_joins_base_and_encodes_params() {
        let url = client()
            .endpoint("search", &[("channelId", "UC a&b"), ("maxResults", "1")])
            .unwrap();
        assert_eq!(url.path(), "/youtube/v3/search");
        assert_eq!(url.query(), Some("channelId=UC+a%26b&maxResults=1"));
    }

    #[test]
    fn default_page_size_is_provider_max() {
        assert_eq!(YoutubeClientConfig::default().page_size, 50);
    }
}
