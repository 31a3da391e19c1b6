use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A followed channel as cached in the subscriptions snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub channel_id: String,
    pub channel_title: String,
}

#[cfg(test)]
impl Subscription {
    pub fn new(channel_id: impl Into<String>, channel_title: impl Into<String>) -> Self {
        Self { channel_id: channel_id.into(), channel_title: channel_title.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionPage {
    pub items: Vec<Subscription>,
    pub next_page_token: Option<String>,
}

/// Most recent upload returned by a date-ordered search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestVideo {
    pub published_at: DateTime<Utc>,
    pub video_id: Option<String>,
}

// Wire types for the three Data API endpoints we call.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiSubscriptionList {
    #[serde(default)]
    pub items: Vec<ApiSubscriptionItem>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiSubscriptionItem {
    pub snippet: ApiSubscriptionSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiSubscriptionSnippet {
    #[serde(default)]
    pub title: String,
    pub resource_id: ApiResourceId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiResourceId {
    pub channel_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiSearchList {
    #[serde(default)]
    pub items: Vec<ApiSearchItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiSearchItem {
    #[serde(default)]
    pub id: Option<ApiSearchId>,
    #[serde(default)]
    pub snippet: Option<ApiSearchSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiSearchId {
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiSearchSnippet {
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiVideoList {
    #[serde(default)]
    pub items: Vec<ApiVideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiVideoItem {
    pub content_details: ApiContentDetails,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiContentDetails {
    pub duration: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    pub reason: Option<String>,
}

impl From<ApiSubscriptionList> for SubscriptionPage {
    fn from(list: ApiSubscriptionList) -> Self {
        SubscriptionPage {
            items: list
                .items
                .into_iter()
                .map(|i| Subscription { channel_id: i.snippet.resource_id.channel_id, channel_title: i.snippet.title })
                .collect(),
            next_page_token: list.next_page_token.filter(|t| !t.is_empty()),
        }
    }
}

impl ApiSearchList {
    /// First hit with a publish time; a hit without one counts as no upload.
    pub(crate) fn into_latest(self) -> Option<LatestVideo> {
        let item = self.items.into_iter().next()?;
        let published_at = item.snippet.and_then(|s| s.published_at)?;
        Some(LatestVideo { published_at, video_id: item.id.and_then(|id| id.video_id) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn subscription_page_maps_snippet_fields() {
        let raw = r#"{
            "nextPageToken": "CDIQAA",
            "items": [
                {"snippet": {"title": "Alpha", "resourceId": {"kind": "youtube#channel", "channelId": "UCa"}}},
                {"snippet": {"title": "Beta", "resourceId": {"channelId": "UCb"}}}
            ]
        }"#;
        let list: ApiSubscriptionList = serde_json::from_str(raw).unwrap();
        let page = SubscriptionPage::from(list);
        assert_eq!(page.items, vec![Subscription::new("UCa", "Alpha"), Subscription::new("UCb", "Beta")]);
        assert_eq!(page.next_page_token.as_deref(), Some("CDIQAA"));
    }

    #[test]
    fn last_page_has_no_token() {
        let list: ApiSubscriptionList = serde_json::from_str(r#"{"items": [], "nextPageToken": ""}"#).unwrap();
        assert_eq!(SubscriptionPage::from(list).next_page_token, None);
    }

    #[test]
    fn search_hit_parses_utc_publish_time() {
        let raw = r#"{"items": [{"id": {"videoId": "v1"}, "snippet": {"publishedAt": "2024-03-01T12:30:00Z"}}]}"#;
        let list: ApiSearchList = serde_json::from_str(raw).unwrap();
        let latest = list.into_latest().unwrap();
        assert_eq!(latest.published_at, Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap());
        assert_eq!(latest.video_id.as_deref(), Some("v1"));
    }

    #[test]
    fn empty_search_is_none() {
        let list: ApiSearchList = serde_json::from_str(r#"{"items": []}"#).unwrap();
        assert!(list.into_latest().is_none());
        let list: ApiSearchList = serde_json::from_str(r#"{"items": [{"id": {"videoId": "v"}}]}"#).unwrap();
        assert!(list.into_latest().is_none());
    }

    #[test]
    fn snapshot_uses_camel_case_keys() {
        let s = serde_json::to_string(&Subscription::new("UCx", "X")).unwrap();
        assert_eq!(s, r#"{"channelId":"UCx","channelTitle":"X"}"#);
    }
}
