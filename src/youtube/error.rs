use reqwest::StatusCode;
use thiserror::Error;

/// Reasons the Data API uses when a request is refused for budget reasons.
const QUOTA_REASONS: &[&str] = &["quotaExceeded", "dailyLimitExceeded", "rateLimitExceeded", "userRateLimitExceeded"];

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("request timed out")]
    Timeout,

    #[error("api error {status}: {message}")]
    Api {
        status: StatusCode,
        reason: Option<String>,
        message: String,
    },

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("auth error: {0}")]
    Auth(String),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() { ApiError::Timeout } else { ApiError::Http(err) }
    }

    /// The provider refused the call because the project ran out of quota.
    pub fn is_quota_exceeded(&self) -> bool {
        match self {
            ApiError::Api { status, reason: Some(reason), .. } => {
                (*status == StatusCode::FORBIDDEN || *status == StatusCode::TOO_MANY_REQUESTS)
                    && QUOTA_REASONS.contains(&reason.as_str())
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: StatusCode, reason: Option<&str>) -> ApiError {
        ApiError::Api { status, reason: reason.map(str::to_string), message: "nope".into() }
    }

    #[test]
    fn quota_refusal_is_recognised() {
        assert!(api(StatusCode::FORBIDDEN, Some("quotaExceeded")).is_quota_exceeded());
        assert!(api(StatusCode::TOO_MANY_REQUESTS, Some("rateLimitExceeded")).is_quota_exceeded());
        assert!(!api(StatusCode::FORBIDDEN, Some("forbidden")).is_quota_exceeded());
        assert!(!api(StatusCode::BAD_REQUEST, Some("quotaExceeded")).is_quota_exceeded());
        assert!(!ApiError::Timeout.is_quota_exceeded());
    }

    #[test]
    fn api_error_display_includes_status() {
        let err = api(StatusCode::NOT_FOUND, Some("channelNotFound"));
        assert_eq!(format!("{err}"), "api error 404 Not Found: nope");
        assert!(!err.is_quota_exceeded());
    }
}
