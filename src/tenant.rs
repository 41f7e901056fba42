//! Per-identity collection lifecycle.
//!
//! Each identity maps to exactly one vector-store collection named by its
//! fingerprint. Collections are created lazily on first ingestion and never
//! deleted here.

use std::sync::Arc;

use anyhow::Result;
use ask_rag_core::embedding::EmbeddingProvider;
use ask_rag_core::fingerprint;
use ask_rag_core::store::{CollectionRef, CreateOutcome, VectorStore};

#[derive(Clone)]
pub struct TenantCollectionManager {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl TenantCollectionManager {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { store, embedder }
    }

    pub fn fingerprint(identity: &str) -> String {
        fingerprint::fingerprint(identity)
    }

    pub fn collection_handle(&self, identity: &str) -> CollectionRef {
        CollectionRef::new(Self::fingerprint(identity))
    }

    pub async fn exists(&self, identity: &str) -> Result<bool> {
        self.store
            .collection_exists(&Self::fingerprint(identity))
            .await
    }

    /// Make sure the identity's collection exists. Idempotent, and safe
    /// when several first-time callers race.
    pub async fn ensure_exists(&self, identity: &str) -> Result<CollectionRef> {
        let handle = self.collection_handle(identity);
        if self.store.collection_exists(handle.name()).await? {
            return Ok(handle);
        }

        match self
            .store
            .create_collection(handle.name(), self.embedder.dims())
            .await?
        {
            CreateOutcome::Created => {
                tracing::info!(
                    tenant = handle.name(),
                    dims = self.embedder.dims(),
                    backend = self.store.backend_name(),
                    "created tenant collection"
                );
            }
            CreateOutcome::AlreadyExists => {
                tracing::debug!(tenant = handle.name(), "collection created concurrently");
            }
        }
        Ok(handle)
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }
}
