use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;

use super::{ActivityService, ApiError, LatestVideo, Subscription, SubscriptionPage};

/// Scripted answer for one channel's latest-video search.
#[derive(Debug, Clone)]
pub enum SearchScript {
    Latest { published_at: DateTime<Utc>, video_id: Option<String> },
    NoVideos,
    Fail(String),
    QuotaExceeded,
    /// Never answers; the caller has to give up on it.
    Hang,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    ListSubscriptions(Option<String>),
    Search(String),
    Duration(String),
}

#[derive(Debug, Default)]
pub struct MockService {
    pages: Mutex<VecDeque<Result<SubscriptionPage, String>>>,
    searches: Mutex<HashMap<String, SearchScript>>,
    durations: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the subscription list as pages chained by synthetic tokens.
    pub fn with_pages(self, pages: Vec<Vec<Subscription>>) -> Self {
        let n = pages.len();
        {
            let mut q = self.pages.lock().unwrap();
            for (i, items) in pages.into_iter().enumerate() {
                let next_page_token = (i + 1 < n).then(|| format!("page-{}", i + 1));
                q.push_back(Ok(SubscriptionPage { items, next_page_token }));
            }
        }
        self
    }

    pub fn push_page(&self, items: Vec<Subscription>, next_page_token: Option<&str>) {
        self.pages.lock().unwrap().push_back(Ok(SubscriptionPage { items, next_page_token: next_page_token.map(str::to_string) }));
    }

    pub fn push_page_error(&self, msg: impl Into<String>) {
        self.pages.lock().unwrap().push_back(Err(msg.into()));
    }

    pub fn script(&self, channel_id: &str, script: SearchScript) {
        self.searches.lock().unwrap().insert(channel_id.to_string(), script);
    }

    pub fn set_duration(&self, video_id: &str, d: Duration) {
        self.durations.lock().unwrap().insert(video_id.to_string(), d);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn searched(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c { MockCall::Search(id) => Some(id), _ => None })
            .collect()
    }
}

fn unscripted(what: &str) -> ApiError {
    ApiError::Api {
        status: StatusCode::NOT_IMPLEMENTED,
        reason: Some("unscripted".into()),
        message: format!("mock service has no scripted response for {what}"),
    }
}

#[async_trait]
impl ActivityService for MockService {
    async fn list_subscriptions(&self, page_token: Option<&str>) -> Result<SubscriptionPage, ApiError> {
        self.calls.lock().unwrap().push(MockCall::ListSubscriptions(page_token.map(str::to_string)));
        match self.pages.lock().unwrap().pop_front() {
            Some(Ok(page)) => Ok(page),
            Some(Err(message)) => Err(ApiError::Api { status: StatusCode::INTERNAL_SERVER_ERROR, reason: None, message }),
            None => Err(unscripted("subscriptions page")),
        }
    }

    async fn search_latest_video(&self, channel_id: &str) -> Result<Option<LatestVideo>, ApiError> {
        self.calls.lock().unwrap().push(MockCall::Search(channel_id.to_string()));
        let script = self.searches.lock().unwrap().get(channel_id).cloned();
        match script {
            Some(SearchScript::Latest { published_at, video_id }) => Ok(Some(LatestVideo { published_at, video_id })),
            Some(SearchScript::NoVideos) => Ok(None),
            Some(SearchScript::Fail(message)) => {
                Err(ApiError::Api { status: StatusCode::NOT_FOUND, reason: Some("channelNotFound".into()), message })
            }
            Some(SearchScript::QuotaExceeded) => Err(ApiError::Api {
                status: StatusCode::FORBIDDEN,
                reason: Some("quotaExceeded".into()),
                message: "The request cannot be completed because you have exceeded your quota.".into(),
            }),
            Some(SearchScript::Hang) => std::future::pending().await,
            None => Err(unscripted(channel_id)),
        }
    }

    async fn video_duration(&self, video_id: &str) -> Result<Option<Duration>, ApiError> {
        self.calls.lock().unwrap().push(MockCall::Duration(video_id.to_string()));
        Ok(self.durations.lock().unwrap().get(video_id).copied())
    }
}
