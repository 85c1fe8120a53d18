use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Tracks the GitHub rate limit as reported by response headers.
///
/// Observation only: requests are never delayed or retried.
#[derive(Clone)]
pub struct RateLimiter {
    state: Arc<RwLock<RateLimitState>>,
    warn_threshold: u32,
}

#[derive(Debug, Clone)]
struct RateLimitState {
    limit: u32,
    remaining: u32,
    /// Unix timestamp when rate limit resets
    reset_at: i64,
}

/// Snapshot of the last observed rate limit
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub remaining: u32,
    pub resets_at: DateTime<Utc>,
}

impl RateLimiter {
    pub fn new(warn_threshold: u32) -> Self {
        Self {
            state: Arc::new(RwLock::new(RateLimitState {
                limit: 60, // Default for unauthenticated requests
                remaining: 60,
                reset_at: Utc::now().timestamp() + 3600,
            })),
            warn_threshold,
        }
    }

    /// Update rate limit from GitHub API response headers
    pub async fn update_from_headers(&self, headers: &reqwest::header::HeaderMap) {
        let parse = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<i64>().ok())
        };

        let (limit, remaining, reset) = (
            parse("x-ratelimit-limit"),
            parse("x-ratelimit-remaining"),
            parse("x-ratelimit-reset"),
        );
        if limit.is_none() && remaining.is_none() && reset.is_none() {
            return;
        }

        let mut state = self.state.write().await;
        if let Some(limit) = limit {
            state.limit = limit.max(0) as u32;
        }
        if let Some(remaining) = remaining {
            state.remaining = remaining.max(0) as u32;
        }
        if let Some(reset) = reset {
            state.reset_at = reset;
        }

        debug!(
            "Rate limit updated: {}/{} (resets at {})",
            state.remaining, state.limit, state.reset_at
        );

        if state.remaining <= self.warn_threshold {
            warn!(
                "GitHub rate limit nearly exhausted ({}/{} remaining)",
                state.remaining, state.limit
            );
        }
    }

    pub async fn is_exhausted(&self) -> bool {
        self.state.read().await.remaining == 0
    }

    /// Get current rate limit status
    pub async fn status(&self) -> RateLimitStatus {
        let state = self.state.read().await;
        RateLimitStatus {
            limit: state.limit,
            remaining: state.remaining,
            resets_at: DateTime::from_timestamp(state.reset_at, 0).unwrap_or_else(Utc::now),
        }
    }
}
