//! Typed errors at the request boundaries.
//!
//! Collaborators (stores, providers, loaders) speak `anyhow`. The
//! orchestrators turn their failures into the enums below, and every
//! variant knows its HTTP status and machine-readable code so the server
//! can render `{"error":{"code","message"}}` without string matching.

use axum::http::StatusCode;
use thiserror::Error;

/// Upload rejected by the file validator.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{0}")]
    MissingHeader(&'static str),

    #[error("File type not allowed. Allowed types are: {allowed}")]
    UnsupportedType { allowed: String },

    #[error("File size exceeds maximum limit of {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("File extension does not match content type. Expected {expected}")]
    ExtensionMismatch { expected: &'static str },

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

impl ValidationError {
    pub fn status(&self) -> StatusCode {
        match self {
            ValidationError::MissingHeader(_) => StatusCode::BAD_REQUEST,
            ValidationError::UnsupportedType { .. } | ValidationError::ExtensionMismatch { .. } => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            ValidationError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ValidationError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingHeader(_) => "bad_request",
            ValidationError::UnsupportedType { .. } | ValidationError::ExtensionMismatch { .. } => {
                "unsupported_media_type"
            }
            ValidationError::PayloadTooLarge { .. } => "payload_too_large",
            ValidationError::Io(_) => "upload_io",
        }
    }
}

/// A fixed window was exhausted for this identity and endpoint.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Rate limit exceeded for {endpoint}: {limit} requests per {window_seconds} seconds")]
pub struct RateLimitExceeded {
    pub endpoint: String,
    pub limit: u64,
    pub window_seconds: u64,
}

/// Which step of the ingestion pipeline failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestionStage {
    Load,
    Embed,
    Collection,
    Store,
}

impl std::fmt::Display for IngestionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IngestionStage::Load => "load",
            IngestionStage::Embed => "embed",
            IngestionStage::Collection => "collection",
            IngestionStage::Store => "store",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
#[error("Error ingesting PDF file: {source}")]
pub struct IngestionError {
    pub stage: IngestionStage,
    #[source]
    pub source: anyhow::Error,
}

impl IngestionError {
    pub fn new(stage: IngestionStage, source: impl Into<anyhow::Error>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

/// Any failure while answering a question.
#[derive(Debug, Error)]
#[error("{cause}")]
pub struct RetrievalError {
    #[source]
    pub cause: anyhow::Error,
}

impl From<anyhow::Error> for RetrievalError {
    fn from(cause: anyhow::Error) -> Self {
        Self { cause }
    }
}

/// Everything an orchestrator can hand back to a transport.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    RateLimited(#[from] RateLimitExceeded),

    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error("Dependency unavailable: {0}")]
    Dependency(#[source] anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(#[source] anyhow::Error),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Validation(e) => e.status(),
            ServiceError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ServiceError::Ingestion(_)
            | ServiceError::Retrieval(_)
            | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Dependency(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::Validation(e) => e.code(),
            ServiceError::RateLimited(_) => "rate_limited",
            ServiceError::Ingestion(_) => "ingestion_failed",
            ServiceError::Retrieval(_) => "retrieval_failed",
            ServiceError::Dependency(_) => "dependency_unavailable",
            ServiceError::Internal(_) => "internal",
        }
    }

    /// True for errors caused by the caller rather than by this service.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_code_table() {
        let cases: Vec<(ServiceError, u16, &str)> = vec![
            (
                ValidationError::MissingHeader("Filename is required").into(),
                400,
                "bad_request",
            ),
            (
                ValidationError::UnsupportedType {
                    allowed: ".pdf".into(),
                }
                .into(),
                415,
                "unsupported_media_type",
            ),
            (
                ValidationError::PayloadTooLarge { limit: 10 }.into(),
                413,
                "payload_too_large",
            ),
            (
                ValidationError::ExtensionMismatch { expected: ".pdf" }.into(),
                415,
                "unsupported_media_type",
            ),
            (
                ValidationError::Io(std::io::Error::other("disk full")).into(),
                500,
                "upload_io",
            ),
            (ServiceError::BadRequest("x".into()), 400, "bad_request"),
            (ServiceError::Forbidden("x".into()), 403, "forbidden"),
            (
                RateLimitExceeded {
                    endpoint: "ask".into(),
                    limit: 20,
                    window_seconds: 86_400,
                }
                .into(),
                429,
                "rate_limited",
            ),
            (
                IngestionError::new(IngestionStage::Embed, anyhow::anyhow!("boom")).into(),
                500,
                "ingestion_failed",
            ),
            (
                RetrievalError::from(anyhow::anyhow!("boom")).into(),
                500,
                "retrieval_failed",
            ),
            (
                ServiceError::Dependency(anyhow::anyhow!("down")),
                503,
                "dependency_unavailable",
            ),
            (
                ServiceError::Internal(anyhow::anyhow!("oops")),
                500,
                "internal",
            ),
        ];

        for (err, status, code) in cases {
            assert_eq!(err.status().as_u16(), status, "{}", err);
            assert_eq!(err.code(), code, "{}", err);
        }
    }

    #[test]
    fn test_rate_limit_message_names_policy() {
        let err = RateLimitExceeded {
            endpoint: "ingest".into(),
            limit: 5,
            window_seconds: 86_400,
        };
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded for ingest: 5 requests per 86400 seconds"
        );
    }

    #[test]
    fn test_ingestion_message_carries_cause() {
        let err = IngestionError::new(IngestionStage::Load, anyhow::anyhow!("not a PDF"));
        assert_eq!(err.to_string(), "Error ingesting PDF file: not a PDF");
        assert_eq!(err.stage, IngestionStage::Load);
    }

    #[test]
    fn test_client_error_split() {
        assert!(ServiceError::BadRequest("x".into()).is_client_error());
        assert!(!ServiceError::Internal(anyhow::anyhow!("x")).is_client_error());
    }
}
