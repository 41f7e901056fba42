//! Fixed-window rate limiting per identity and endpoint.
//!
//! A window opens on the first request and closes `window_secs` later,
//! regardless of traffic in between. The check and the increment are a
//! single [`CounterStore::consume`] call, so concurrent requests can never
//! push a counter past its limit.

use std::sync::Arc;

use anyhow::Result;
use ask_rag_core::counter::CounterStore;

use crate::config::RateLimitPolicy;
use crate::error::{RateLimitExceeded, ServiceError};

pub const INGEST_ENDPOINT: &str = "ingest";
pub const ASK_ENDPOINT: &str = "ask";

/// Counter key for an identity on an endpoint.
pub fn counter_key(endpoint: &str, identity: &str) -> String {
    format!("rate_limit:{}:{}", endpoint, identity)
}

#[derive(Clone)]
pub struct FixedWindowLimiter {
    store: Arc<dyn CounterStore>,
}

/// The limiter used by the orchestrators.
pub type RateLimiter = FixedWindowLimiter;

impl FixedWindowLimiter {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    /// Consume one request from the current window.
    ///
    /// Returns `Ok(false)` once `max_requests` have been admitted in this
    /// window. Store failures are errors, never an implicit allow.
    pub async fn check_and_consume(
        &self,
        identity: &str,
        endpoint: &str,
        max_requests: u64,
        window_secs: u64,
    ) -> Result<bool> {
        let key = counter_key(endpoint, identity);
        let count = self.store.consume(&key, max_requests, window_secs).await?;
        Ok(count.is_some())
    }

    /// Like [`check_and_consume`](Self::check_and_consume), mapped onto the
    /// service error taxonomy.
    pub async fn enforce(
        &self,
        identity: &str,
        endpoint: &str,
        policy: &RateLimitPolicy,
    ) -> Result<(), ServiceError> {
        let allowed = self
            .check_and_consume(identity, endpoint, policy.max_requests, policy.window_secs)
            .await
            .map_err(ServiceError::Dependency)?;

        if allowed {
            Ok(())
        } else {
            Err(RateLimitExceeded {
                endpoint: endpoint.to_string(),
                limit: policy.max_requests,
                window_seconds: policy.window_secs,
            }
            .into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ask_rag_core::counter::{InMemoryCounterStore, ManualClock};
    use async_trait::async_trait;
    use std::time::Duration;

    fn limiter() -> (FixedWindowLimiter, Arc<InMemoryCounterStore>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let store = Arc::new(InMemoryCounterStore::with_clock(clock.clone()));
        (FixedWindowLimiter::new(store.clone()), store, clock)
    }

    #[tokio::test]
    async fn test_limit_then_reject_then_reset() {
        let (limiter, store, clock) = limiter();
        for _ in 0..3 {
            assert!(limiter
                .check_and_consume("a@x.io", "ask", 3, 60)
                .await
                .unwrap());
        }
        assert!(!limiter
            .check_and_consume("a@x.io", "ask", 3, 60)
            .await
            .unwrap());
        assert_eq!(
            store.get_if_present("rate_limit:ask:a@x.io").await.unwrap(),
            Some(3)
        );

        clock.advance(Duration::from_secs(60));
        assert!(limiter
            .check_and_consume("a@x.io", "ask", 3, 60)
            .await
            .unwrap());
        assert_eq!(
            store.get_if_present("rate_limit:ask:a@x.io").await.unwrap(),
            Some(1)
        );
    }

    #[tokio::test]
    async fn test_endpoints_and_identities_are_independent() {
        let (limiter, _, _) = limiter();
        assert!(limiter.check_and_consume("a", "ask", 1, 60).await.unwrap());
        assert!(!limiter.check_and_consume("a", "ask", 1, 60).await.unwrap());
        assert!(limiter.check_and_consume("a", "ingest", 1, 60).await.unwrap());
        assert!(limiter.check_and_consume("b", "ask", 1, 60).await.unwrap());
    }

    #[tokio::test]
    async fn test_enforce_maps_rejection() {
        let (limiter, _, _) = limiter();
        let policy = RateLimitPolicy {
            max_requests: 1,
            window_secs: 86_400,
        };
        limiter.enforce("a", INGEST_ENDPOINT, &policy).await.unwrap();
        let err = limiter
            .enforce("a", INGEST_ENDPOINT, &policy)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "rate_limited");
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded for ingest: 1 requests per 86400 seconds"
        );
    }

    struct DownStore;

    #[async_trait]
    impl CounterStore for DownStore {
        fn backend_name(&self) -> &str {
            "down"
        }
        async fn get_if_present(&self, _key: &str) -> Result<Option<u64>> {
            anyhow::bail!("connection refused")
        }
        async fn set_with_expiry(&self, _key: &str, _value: u64, _ttl: u64) -> Result<()> {
            anyhow::bail!("connection refused")
        }
        async fn increment(&self, _key: &str) -> Result<u64> {
            anyhow::bail!("connection refused")
        }
        async fn consume(&self, _key: &str, _limit: u64, _ttl: u64) -> Result<Option<u64>> {
            anyhow::bail!("connection refused")
        }
    }

    #[tokio::test]
    async fn test_store_failure_is_not_an_allow() {
        let limiter = FixedWindowLimiter::new(Arc::new(DownStore));
        assert!(limiter.check_and_consume("a", "ask", 5, 60).await.is_err());

        let err = limiter
            .enforce(
                "a",
                ASK_ENDPOINT,
                &RateLimitPolicy {
                    max_requests: 5,
                    window_secs: 60,
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status().as_u16(), 503);
    }
}
