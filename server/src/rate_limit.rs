//! Per-address fixed-window request limiter. State lives in this process
//! only; several instances each count separately.

use std::{
    collections::HashMap,
    net::SocketAddr,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::Mutex;
use tracing::warn;

use crate::{config::RateLimitConfig, http::HttpError};

/// Entries are swept once the map grows past this many addresses.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Counts one request from `key` at `now`. `Err` carries how long until
    /// the current window ends.
    pub async fn check(&self, key: &str, now: Instant) -> Result<(), Duration> {
        let window_len = self.config.window;
        let mut windows = self.windows.lock().await;
        if windows.len() > PRUNE_THRESHOLD {
            windows.retain(|_, w| now.duration_since(w.started) < window_len);
        }
        let window = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started: now,
        });
        if now.duration_since(window.started) >= window_len {
            *window = Window {
                count: 0,
                started: now,
            };
        }
        window.count = window.count.saturating_add(1);
        if window.count > self.config.max_requests {
            let elapsed = now.duration_since(window.started);
            return Err(window_len.saturating_sub(elapsed));
        }
        Ok(())
    }
}

/// First `X-Forwarded-For` hop, else the socket peer.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn limit_requests(
    State(limiter): State<std::sync::Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let key = client_key(request.headers(), peer);
    match limiter.check(&key, Instant::now()).await {
        Ok(()) => next.run(request).await,
        Err(retry_after) => {
            warn!(client = %key, "rate limit exceeded");
            let secs = retry_after.as_secs().max(1);
            let mut response = HttpError::new(
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                "too many requests, slow down",
            )
            .into_response();
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            max_requests,
            window: Duration::from_secs(60),
        })
    }

    #[tokio::test]
    async fn hundred_and_first_request_is_rejected() {
        let limiter = limiter(100);
        let start = Instant::now();
        for i in 0..100 {
            assert!(limiter.check("10.0.0.1", start + Duration::from_millis(i)).await.is_ok());
        }
        let retry = limiter
            .check("10.0.0.1", start + Duration::from_secs(20))
            .await
            .unwrap_err();
        assert_eq!(retry, Duration::from_secs(40));
        // other addresses are unaffected
        assert!(limiter.check("10.0.0.2", start + Duration::from_secs(20)).await.is_ok());
    }

    #[tokio::test]
    async fn a_new_window_starts_fresh() {
        let limiter = limiter(2);
        let start = Instant::now();
        assert!(limiter.check("ip", start).await.is_ok());
        assert!(limiter.check("ip", start).await.is_ok());
        assert!(limiter.check("ip", start + Duration::from_secs(59)).await.is_err());
        assert!(limiter.check("ip", start + Duration::from_secs(60)).await.is_ok());
    }

    #[test]
    fn forwarded_address_wins_over_peer() {
        let mut headers = HeaderMap::new();
        let peer: SocketAddr = "192.0.2.7:5000".parse().unwrap();
        assert_eq!(client_key(&headers, Some(peer)), "192.0.2.7");
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.1"),
        );
        assert_eq!(client_key(&headers, Some(peer)), "203.0.113.9");
        assert_eq!(client_key(&HeaderMap::new(), None), "unknown");
    }
}
