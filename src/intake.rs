//! Upload intake.
//!
//! Order of checks for one upload:
//!
//! 1. identity shape
//! 2. `ingest` rate limit
//! 3. header phase (nothing read yet)
//! 4. temp file allocation
//! 5. content phase (streamed, size enforced on actual bytes)
//! 6. PDF → ingestion pipeline; other allowed types → `Unsupported`
//!
//! The temp file is owned by this request and deleted on every path,
//! including when the handler future is dropped mid-stream.

use std::path::PathBuf;
use std::sync::Arc;

use ask_rag_core::models::IngestSummary;
use tempfile::NamedTempFile;
use tokio::io::AsyncRead;

use crate::config::{IntakeConfig, RateLimitPolicy};
use crate::error::ServiceError;
use crate::identity::validate_identity;
use crate::ingest::IngestionPipeline;
use crate::rate_limit::{RateLimiter, INGEST_ENDPOINT};
use crate::tenant::TenantCollectionManager;
use crate::validate::{FileKind, FileValidator, UploadRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    Ingested {
        filename: String,
        summary: IngestSummary,
    },
    /// Allowed type that this service does not process yet.
    Unsupported { filename: String },
}

pub struct IntakeOrchestrator {
    validator: FileValidator,
    limiter: RateLimiter,
    policy: RateLimitPolicy,
    pipeline: Arc<IngestionPipeline>,
    temp_dir: PathBuf,
    temp_prefix: String,
    temp_suffix: String,
}

impl IntakeOrchestrator {
    pub fn new(
        config: &IntakeConfig,
        policy: RateLimitPolicy,
        limiter: RateLimiter,
        pipeline: Arc<IngestionPipeline>,
    ) -> Self {
        Self {
            validator: FileValidator::from_config(config),
            limiter,
            policy,
            pipeline,
            temp_dir: config.temp_dir.clone().unwrap_or_else(std::env::temp_dir),
            temp_prefix: config.temp_prefix.clone(),
            temp_suffix: config.temp_suffix.clone(),
        }
    }

    pub async fn handle<R>(
        &self,
        request: UploadRequest,
        reader: &mut R,
    ) -> Result<IntakeOutcome, ServiceError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let tenant = TenantCollectionManager::fingerprint(&request.user_identity);
        let result = self.run(request, reader).await;
        match &result {
            Ok(IntakeOutcome::Ingested { summary, .. }) => {
                tracing::info!(
                    tenant = %tenant,
                    pages = summary.pages,
                    chunks = summary.chunks,
                    bytes = summary.size,
                    "upload ingested"
                );
            }
            Ok(IntakeOutcome::Unsupported { .. }) => {
                tracing::info!(tenant = %tenant, "upload accepted but type not processed");
            }
            Err(e) if e.is_client_error() => {
                tracing::warn!(tenant = %tenant, code = e.code(), "upload rejected: {}", e);
            }
            Err(e) => {
                tracing::error!(tenant = %tenant, code = e.code(), "upload failed: {:#}", e);
            }
        }
        result
    }

    async fn run<R>(
        &self,
        request: UploadRequest,
        reader: &mut R,
    ) -> Result<IntakeOutcome, ServiceError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        validate_identity(&request.user_identity)?;
        self.limiter
            .enforce(&request.user_identity, INGEST_ENDPOINT, &self.policy)
            .await?;

        let headers = self.validator.validate_headers(&request)?;
        let temp = self
            .allocate_temp(headers.kind)
            .map_err(|e| ServiceError::Internal(e.into()))?;
        let file = self.validator.validate_content(headers, reader, temp).await?;
        tracing::debug!(bytes = file.size(), kind = ?file.kind(), "upload received");

        if file.kind() != FileKind::Pdf {
            return Ok(IntakeOutcome::Unsupported {
                filename: file.filename().to_string(),
            });
        }

        let filename = file.filename().to_string();
        let ingested = self
            .pipeline
            .ingest_as(file.path(), &filename, &request.user_identity)
            .await;
        if let Err(e) = file.close() {
            tracing::warn!("failed to remove upload temp file: {}", e);
        }

        Ok(IntakeOutcome::Ingested {
            filename,
            summary: ingested?,
        })
    }

    fn allocate_temp(&self, kind: FileKind) -> std::io::Result<NamedTempFile> {
        tempfile::Builder::new()
            .prefix(&self.temp_prefix)
            .suffix(&format!("{}{}", self.temp_suffix, kind.extension()))
            .tempfile_in(&self.temp_dir)
    }
}
