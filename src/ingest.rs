//! PDF ingestion pipeline.
//!
//! ```text
//! file ──▶ load pages ──▶ split ──▶ embed (batched) ──▶ ensure collection ──▶ add_documents
//! ```
//!
//! Embedding runs before the tenant collection is ensured, so a failed
//! embed never leaves an empty collection behind. All chunks of a document
//! are written in a single `add_documents` call. If that write fails after
//! the collection was created, the empty collection stays; the tenant's
//! next successful ingest fills it.

use std::path::Path;
use std::sync::Arc;

use ask_rag_core::chunk::TextSplitter;
use ask_rag_core::embedding::EmbeddingProvider;
use ask_rag_core::models::IngestSummary;

use crate::error::{IngestionError, IngestionStage};
use crate::loader::DocumentLoader;
use crate::tenant::TenantCollectionManager;

pub struct IngestionPipeline {
    loader: Arc<dyn DocumentLoader>,
    splitter: TextSplitter,
    embedder: Arc<dyn EmbeddingProvider>,
    tenants: TenantCollectionManager,
    batch_size: usize,
}

impl IngestionPipeline {
    pub fn new(
        loader: Arc<dyn DocumentLoader>,
        splitter: TextSplitter,
        embedder: Arc<dyn EmbeddingProvider>,
        tenants: TenantCollectionManager,
        batch_size: usize,
    ) -> Self {
        Self {
            loader,
            splitter,
            embedder,
            tenants,
            batch_size: batch_size.max(1),
        }
    }

    /// Ingest the document at `path` into `identity`'s collection, labelling
    /// chunks with the path.
    pub async fn ingest(
        &self,
        path: &Path,
        identity: &str,
    ) -> Result<IngestSummary, IngestionError> {
        let source = path.display().to_string();
        self.ingest_as(path, &source, identity).await
    }

    /// Like [`ingest`](Self::ingest), with an explicit source label for chunk
    /// metadata (usually the uploaded filename).
    pub async fn ingest_as(
        &self,
        path: &Path,
        source: &str,
        identity: &str,
    ) -> Result<IngestSummary, IngestionError> {
        let tenant = TenantCollectionManager::fingerprint(identity);

        let size = tokio::fs::metadata(path)
            .await
            .map_err(|e| IngestionError::new(IngestionStage::Load, e))?
            .len();

        let loader = self.loader.clone();
        let owned_path = path.to_path_buf();
        let pages = tokio::task::spawn_blocking(move || loader.load(&owned_path))
            .await
            .map_err(|e| IngestionError::new(IngestionStage::Load, e))?
            .map_err(|e| IngestionError::new(IngestionStage::Load, e))?;

        let chunks = self.splitter.split_pages(source, &pages);
        tracing::debug!(
            tenant = %tenant,
            pages = pages.len(),
            chunks = chunks.len(),
            "split document"
        );

        if chunks.is_empty() {
            tracing::info!(tenant = %tenant, pages = pages.len(), "document has no text; nothing stored");
            return Ok(IngestSummary {
                pages: pages.len(),
                chunks: 0,
                size,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embedded = self
                .embedder
                .embed_texts(batch)
                .await
                .map_err(|e| IngestionError::new(IngestionStage::Embed, e))?;
            if embedded.len() != batch.len() {
                return Err(IngestionError::new(
                    IngestionStage::Embed,
                    anyhow::anyhow!(
                        "embedding provider returned {} vectors for {} texts",
                        embedded.len(),
                        batch.len()
                    ),
                ));
            }
            vectors.extend(embedded);
        }

        let collection = self
            .tenants
            .ensure_exists(identity)
            .await
            .map_err(|e| IngestionError::new(IngestionStage::Collection, e))?;

        let written = self
            .tenants
            .store()
            .add_documents(&collection, &chunks, &vectors)
            .await
            .map_err(|e| IngestionError::new(IngestionStage::Store, e))?;

        tracing::info!(
            tenant = %tenant,
            pages = pages.len(),
            chunks = written,
            bytes = size,
            model = self.embedder.model_name(),
            "ingested document"
        );

        Ok(IngestSummary {
            pages: pages.len(),
            chunks: written,
            size,
        })
    }
}
