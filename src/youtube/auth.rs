use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use super::client::{YoutubeClient, YoutubeClientConfig};
use super::error::ApiError;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
// Refresh a little early so a token does not expire mid-scan.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Yields a ready-to-use API handle; any failure here is fatal to the run.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn get_client(&self) -> Result<YoutubeClient, ApiError>;
}

/// Bearer token supplied directly (SUBAUDIT_ACCESS_TOKEN), never refreshed.
pub struct StaticToken {
    pub token: String,
    pub cfg: YoutubeClientConfig,
}

#[async_trait]
impl AuthProvider for StaticToken {
    async fn get_client(&self) -> Result<YoutubeClient, ApiError> {
        if self.token.trim().is_empty() {
            return Err(ApiError::Auth("empty access token".into()));
        }
        YoutubeClient::new(self.cfg.clone(), self.token.trim())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredToken {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => at - ChronoDuration::seconds(EXPIRY_SKEW_SECS) > now,
            None => true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecret>,
    web: Option<ClientSecret>,
}

#[derive(Debug, Clone, Deserialize)]
struct ClientSecret {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// OAuth credentials cached on disk, refreshed with the installed-app client secret when stale.
pub struct OAuthTokenFile {
    pub token_path: PathBuf,
    pub client_secret_path: PathBuf,
    pub cfg: YoutubeClientConfig,
}

impl OAuthTokenFile {
    pub fn new(token_path: impl Into<PathBuf>, client_secret_path: impl Into<PathBuf>, cfg: YoutubeClientConfig) -> Self {
        Self { token_path: token_path.into(), client_secret_path: client_secret_path.into(), cfg }
    }

    async fn load_token(&self) -> Result<StoredToken, ApiError> {
        let raw = tokio::fs::read(&self.token_path).await.map_err(|e| {
            ApiError::Auth(format!(
                "cannot read stored credentials at {}: {e} (complete the OAuth consent flow and save the token there)",
                self.token_path.display()
            ))
        })?;
        serde_json::from_slice(&raw)
            .map_err(|e| ApiError::Auth(format!("malformed token file {}: {e}", self.token_path.display())))
    }

    async fn load_secret(&self) -> Result<ClientSecret, ApiError> {
        let raw = tokio::fs::read(&self.client_secret_path).await.map_err(|e| {
            ApiError::Auth(format!("cannot read client secret {}: {e}", self.client_secret_path.display()))
        })?;
        parse_client_secret(&raw, &self.client_secret_path)
    }

    async fn refresh(&self, stale: &StoredToken, refresh_token: &str) -> Result<StoredToken, ApiError> {
        let secret = self.load_secret().await?;
        let http = HttpClient::builder()
            .timeout(self.cfg.timeout)
            .build()
            .map_err(ApiError::from_reqwest)?;
        let token_uri = secret.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        let response = http
            .post(token_uri)
            .form(&[
                ("client_id", secret.client_id.as_str()),
                ("client_secret", secret.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(ApiError::from_reqwest)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(ApiError::from_reqwest)?;
        if !status.is_success() {
            return Err(ApiError::Auth(format!(
                "token refresh rejected ({status}): {}",
                String::from_utf8_lossy(&bytes).trim()
            )));
        }
        let fresh: RefreshResponse = serde_json::from_slice(&bytes)?;
        Ok(StoredToken {
            access_token: fresh.access_token,
            refresh_token: fresh.refresh_token.or_else(|| stale.refresh_token.clone()),
            expires_at: fresh.expires_in.map(|s| Utc::now() + ChronoDuration::seconds(s)),
        })
    }

    async fn save_token(&self, token: &StoredToken) -> Result<(), ApiError> {
        let body = serde_json::to_vec_pretty(token)?;
        tokio::fs::write(&self.token_path, body)
            .await
            .map_err(|e| ApiError::Auth(format!("cannot save refreshed token to {}: {e}", self.token_path.display())))
    }
}

#[async_trait]
impl AuthProvider for OAuthTokenFile {
    async fn get_client(&self) -> Result<YoutubeClient, ApiError> {
        let token = self.load_token().await?;
        let token = if token.is_fresh(Utc::now()) {
            tracing::debug!(path = %self.token_path.display(), "using stored credentials");
            token
        } else {
            let Some(refresh_token) = token.refresh_token.clone() else {
                return Err(ApiError::Auth("stored access token expired and has no refresh token".into()));
            };
            tracing::info!("Refreshing expired credentials...");
            let fresh = self.refresh(&token, &refresh_token).await?;
            self.save_token(&fresh).await?;
            fresh
        };
        YoutubeClient::new(self.cfg.clone(), token.access_token)
    }
}

fn parse_client_secret(raw: &[u8], path: &Path) -> Result<ClientSecret, ApiError> {
    let file: ClientSecretFile = serde_json::from_slice(raw)
        .map_err(|e| ApiError::Auth(format!("malformed client secret {}: {e}", path.display())))?;
    file.installed
        .or(file.web)
        .ok_or_else(|| ApiError::Auth(format!("{} has neither an \"installed\" nor a \"web\" section", path.display())))
}
