//! Vector storage abstraction for Ask-RAG.
//!
//! The [`VectorStore`] trait is the keyed nearest-neighbour service the
//! tenant manager, ingestion pipeline, and answerer talk to. Every
//! operation is scoped to a named collection; the core never searches
//! across collections, which is what keeps tenants isolated.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{DocumentChunk, RetrievedPassage};

pub use memory::InMemoryVectorStore;

/// Handle to a named collection in a [`VectorStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionRef {
    name: String,
}

impl CollectionRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// What [`VectorStore::create_collection`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// The collection was already there (possibly created by a concurrent
    /// caller). Callers treat this as success.
    AlreadyExists,
}

/// Abstract vector database.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`collection_exists`](VectorStore::collection_exists) | Check whether a collection is present |
/// | [`create_collection`](VectorStore::create_collection) | Create a collection, absorbing "already exists" |
/// | [`add_documents`](VectorStore::add_documents) | Append chunks with their vectors |
/// | [`similarity_search_with_score`](VectorStore::similarity_search_with_score) | Top-k nearest passages with scores |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Short backend label used in logs (e.g. `"memory"`, `"qdrant"`).
    fn backend_name(&self) -> &str;

    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// Create a collection for vectors of size `dims`.
    ///
    /// Must not fail when the collection already exists.
    async fn create_collection(&self, name: &str, dims: usize) -> Result<CreateOutcome>;

    /// Append `chunks` with their `vectors` (same length, same order).
    ///
    /// Either every chunk is stored or an error is returned. Returns the
    /// number of chunks written.
    async fn add_documents(
        &self,
        collection: &CollectionRef,
        chunks: &[DocumentChunk],
        vectors: &[Vec<f32>],
    ) -> Result<usize>;

    /// Return up to `k` passages from `collection` nearest to `query_vec`,
    /// sorted by descending score.
    async fn similarity_search_with_score(
        &self,
        collection: &CollectionRef,
        query_vec: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedPassage>>;
}
