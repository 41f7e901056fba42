//! Question answering entry point.

use std::sync::Arc;

use crate::config::RateLimitPolicy;
use crate::error::ServiceError;
use crate::identity::validate_identity;
use crate::rate_limit::{RateLimiter, ASK_ENDPOINT};
use crate::retrieval::{Answer, RetrievalAnswerer};
use crate::tenant::TenantCollectionManager;

/// Longest accepted query, in characters after trimming.
pub const MAX_QUERY_CHARS: usize = 500;

pub struct QueryOrchestrator {
    limiter: RateLimiter,
    policy: RateLimitPolicy,
    answerer: Arc<RetrievalAnswerer>,
    soft_fail: bool,
}

impl QueryOrchestrator {
    pub fn new(
        policy: RateLimitPolicy,
        limiter: RateLimiter,
        answerer: Arc<RetrievalAnswerer>,
        soft_fail: bool,
    ) -> Self {
        Self {
            limiter,
            policy,
            answerer,
            soft_fail,
        }
    }

    /// Answer `query` for `identity`.
    ///
    /// With soft failure enabled, retrieval errors come back as an apology
    /// string rather than an error.
    pub async fn handle(&self, query: &str, identity: &str) -> Result<String, ServiceError> {
        let tenant = TenantCollectionManager::fingerprint(identity);
        let result = self.run(query, identity).await;
        match &result {
            Ok(_) => {}
            Err(e) if e.is_client_error() => {
                tracing::warn!(tenant = %tenant, code = e.code(), "query rejected: {}", e);
            }
            Err(e) => {
                tracing::error!(tenant = %tenant, code = e.code(), "query failed: {:#}", e);
            }
        }
        result
    }

    async fn run(&self, query: &str, identity: &str) -> Result<String, ServiceError> {
        let len = query.trim().chars().count();
        if len == 0 || len > MAX_QUERY_CHARS {
            return Err(ServiceError::BadRequest(format!(
                "query must be between 1 and {} characters",
                MAX_QUERY_CHARS
            )));
        }
        validate_identity(identity)?;
        self.limiter
            .enforce(identity, ASK_ENDPOINT, &self.policy)
            .await?;

        match self.answerer.answer(query, identity).await {
            Ok(answer) => Ok(answer.text),
            Err(e) if self.soft_fail => {
                tracing::error!(
                    tenant = %TenantCollectionManager::fingerprint(identity),
                    "retrieval failed, answering with apology: {:#}",
                    e
                );
                Ok(Answer::render_soft_failure(&e))
            }
            Err(e) => Err(e.into()),
        }
    }
}
