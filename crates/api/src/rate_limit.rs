//! Rate Limiting Middleware using GCRA Algorithm
//!
//! Per-IP limits on the prediction routes via tower_governor. Each request
//! may run a full period search, so the quota bounds CPU per caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use governor::middleware::StateInformationMiddleware;
use serde::Deserialize;
use std::sync::Arc;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::GovernorError;

use crate::error::ApiError;

/// Governor config keyed by peer IP, with X-RateLimit-* headers
pub type DefaultGovernorConfig =
    tower_governor::governor::GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Apply the limiter to prediction routes
    pub enabled: bool,
    /// Seconds between quota replenishments
    pub per_second: u64,
    /// Burst size (max requests that can be made immediately)
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_second: 1,
            burst_size: 10,
        }
    }
}

impl RateLimitConfig {
    /// Limiter turned off
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Create a rate limiting governor config.
///
/// Uses PeerIpKeyExtractor, so the service must be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`. Returns `None` when
/// the limiter is disabled or a quota value is zero.
pub fn create_governor_config(config: &RateLimitConfig) -> Option<Arc<DefaultGovernorConfig>> {
    if !config.enabled {
        return None;
    }
    GovernorConfigBuilder::default()
        .per_second(config.per_second)
        .burst_size(config.burst_size)
        .use_headers()
        .error_handler(governor_error_response)
        .finish()
        .map(Arc::new)
}

/// Render limiter rejections as `{"detail"}` JSON, keeping the quota headers
pub fn governor_error_response(error: GovernorError) -> Response {
    let (status, detail, headers) = match error {
        GovernorError::TooManyRequests { wait_time, headers } => (
            StatusCode::TOO_MANY_REQUESTS,
            format!("Too many requests, retry in {wait_time}s"),
            headers,
        ),
        GovernorError::UnableToExtractKey => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unable to identify client".to_string(),
            None,
        ),
        GovernorError::Other { code, msg, headers } => {
            (code, msg.unwrap_or_else(|| "Request rejected".to_string()), headers)
        }
    };

    let mut response = ApiError::Rejected { status, detail }.into_response();
    if let Some(headers) = headers {
        response.headers_mut().extend(headers);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.per_second, 1);
        assert_eq!(config.burst_size, 10);
    }

    #[test]
    fn test_create_governor_config() {
        assert!(create_governor_config(&RateLimitConfig::default()).is_some());
        assert!(create_governor_config(&RateLimitConfig::disabled()).is_none());
    }

    #[test]
    fn test_zero_quota_rejected() {
        let config = RateLimitConfig {
            burst_size: 0,
            ..Default::default()
        };
        assert!(create_governor_config(&config).is_none());
    }

    #[tokio::test]
    async fn test_too_many_requests_is_json() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert("x-ratelimit-after", axum::http::HeaderValue::from_static("7"));

        let response = governor_error_response(GovernorError::TooManyRequests {
            wait_time: 7,
            headers: Some(headers),
        });
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()["x-ratelimit-after"], "7");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["detail"], "Too many requests, retry in 7s");
    }
}
