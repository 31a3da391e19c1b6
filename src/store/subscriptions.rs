use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::youtube::{ActivityService, ApiError, Subscription};

use super::{write_atomic, StoreError};

/// Cached snapshot of the full subscription list.
pub struct SubscriptionStore {
    path: PathBuf,
    cooldown: Duration,
}

impl SubscriptionStore {
    pub fn new(path: impl Into<PathBuf>, cooldown: Duration) -> Self {
        Self { path: path.into(), cooldown }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Previously saved snapshot; an absent file is an empty list, not an error.
    pub fn load(&self) -> Result<Vec<Subscription>, StoreError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.path)(e)),
        };
        serde_json::from_slice(&raw).map_err(|source| StoreError::Corrupt { path: self.path.clone(), source })
    }

    /// Walk every page in provider order. Any page failure discards what was gathered so far.
    pub async fn fetch_all(&self, svc: &dyn ActivityService) -> Result<Vec<Subscription>, ApiError> {
        let mut all = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0usize;
        loop {
            let page = svc.list_subscriptions(token.as_deref()).await?;
            pages += 1;
            tracing::debug!(page = pages, items = page.items.len(), "fetched subscriptions page");
            all.extend(page.items);
            match page.next_page_token {
                Some(next) => {
                    token = Some(next);
                    tokio::time::sleep(self.cooldown).await;
                }
                None => break,
            }
        }
        Ok(all)
    }

    pub fn save(&self, list: &[Subscription]) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(list)
            .map_err(|source| StoreError::Corrupt { path: self.path.clone(), source })?;
        write_atomic(&self.path, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::youtube::mock::{MockCall, MockService};
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> SubscriptionStore {
        SubscriptionStore::new(dir.path().join("subscriptions.json"), Duration::ZERO)
    }

    #[test]
    fn missing_snapshot_loads_empty() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir).load().unwrap().is_empty());
    }

    #[test]
    fn corrupt_snapshot_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("subscriptions.json"), "{not json").unwrap();
        assert!(matches!(store(&dir).load(), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn save_then_load_keeps_order() {
        let dir = TempDir::new().unwrap();
        let s = store(&dir);
        let list = vec![Subscription::new("UCb", "B"), Subscription::new("UCa", "A")];
        s.save(&list).unwrap();
        assert_eq!(s.load().unwrap(), list);
    }

    #[tokio::test]
    async fn fetch_all_follows_page_tokens_in_order() {
        let dir = TempDir::new().unwrap();
        let svc = MockService::new().with_pages(vec![
            vec![Subscription::new("UC1", "one"), Subscription::new("UC2", "two")],
            vec![Subscription::new("UC2", "two")],
            vec![Subscription::new("UC3", "three")],
        ]);
        let list = store(&dir).fetch_all(&svc).await.unwrap();
        let ids: Vec<_> = list.iter().map(|s| s.channel_id.as_str()).collect();
        // no dedup across pages
        assert_eq!(ids, ["UC1", "UC2", "UC2", "UC3"]);
        assert_eq!(
            svc.calls(),
            vec![
                MockCall::ListSubscriptions(None),
                MockCall::ListSubscriptions(Some("page-1".into())),
                MockCall::ListSubscriptions(Some("page-2".into())),
            ]
        );
    }

    #[tokio::test]
    async fn page_failure_fails_the_whole_fetch() {
        let dir = TempDir::new().unwrap();
        let svc = MockService::new();
        svc.push_page_error("backend error");
        assert!(store(&dir).fetch_all(&svc).await.is_err());
    }
}
