//! Rate limiting middleware
//!
//! Token-bucket limiter keyed by client IP. Buckets live in process
//! memory, so limits are per instance and advisory; nothing correctness-
//! critical depends on them.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{collections::HashMap, sync::Arc, time::Instant};
use tokio::sync::RwLock;

use super::client_ip;

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    refreshed: Instant,
}

impl Bucket {
    fn full(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            refreshed: Instant::now(),
        }
    }

    /// Refill from elapsed time, then try to take one token.
    fn try_take(&mut self, refill_per_second: f64, capacity: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.refreshed).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_per_second).min(capacity);
        self.refreshed = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Shared limiter state, cheap to clone into the middleware layer
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<RwLock<HashMap<String, Bucket>>>,
    refill_per_second: f64,
    capacity: f64,
}

impl RateLimiter {
    /// Sustained rate is `requests_per_second`; bursts up to twice that.
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            buckets: Arc::new(RwLock::new(HashMap::new())),
            refill_per_second: requests_per_second as f64,
            capacity: (requests_per_second * 2) as f64,
        }
    }

    /// Whether this client gets another request right now
    pub async fn allow(&self, key: &str) -> bool {
        let mut buckets = self.buckets.write().await;

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| Bucket::full(self.capacity));

        bucket.try_take(self.refill_per_second, self.capacity)
    }

    /// Drop buckets idle longer than `max_age`; called from a background task
    pub async fn cleanup(&self, max_age: std::time::Duration) {
        let mut buckets = self.buckets.write().await;
        let now = Instant::now();

        buckets.retain(|_, bucket| now.duration_since(bucket.refreshed) < max_age);
    }
}

/// Middleware entry point; wire with `middleware::from_fn_with_state`.
pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let client_key = client_ip(request.headers()).unwrap_or_else(|| "unknown".to_string());

    if !limiter.allow(&client_key).await {
        tracing::warn!(client = %client_key, "Rate limit exceeded");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, "1")],
            "Too many requests. Please try again later.",
        )
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_burst_then_deny() {
        let limiter = RateLimiter::new(5);

        // Burst capacity is 2x the sustained rate
        for _ in 0..10 {
            assert!(limiter.allow("test-client").await);
        }

        assert!(!limiter.allow("test-client").await);
    }

    #[tokio::test]
    async fn test_clients_have_separate_buckets() {
        let limiter = RateLimiter::new(2);

        assert!(limiter.allow("client-a").await);
        assert!(limiter.allow("client-b").await);
        assert!(limiter.allow("client-a").await);
        assert!(limiter.allow("client-b").await);
    }

    #[tokio::test]
    async fn test_cleanup_drops_idle_buckets() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.allow("short-lived").await);
        assert!(limiter.allow("short-lived").await);
        assert!(!limiter.allow("short-lived").await);

        limiter.cleanup(std::time::Duration::ZERO).await;

        // The exhausted bucket is gone; the client starts over with a full one
        assert!(limiter.allow("short-lived").await);
    }
}
