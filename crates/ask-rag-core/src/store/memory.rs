//! In-memory [`VectorStore`] implementation for tests and single-process use.
//!
//! Collections live in a `HashMap` behind a `parking_lot::RwLock`.
//! Search is brute-force cosine similarity over the collection's vectors.

use std::collections::HashMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::embedding::cosine_similarity;
use crate::models::{DocumentChunk, RetrievedPassage};

use super::{CollectionRef, CreateOutcome, VectorStore};

struct StoredChunk {
    chunk: DocumentChunk,
    vector: Vec<f32>,
}

struct Collection {
    dims: usize,
    entries: Vec<StoredChunk>,
}

/// In-memory vector store.
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Number of collections currently held.
    pub fn collection_count(&self) -> usize {
        self.collections.read().len()
    }

    /// Number of chunks stored in `name`, or `None` if it does not exist.
    pub fn len_of(&self, name: &str) -> Option<usize> {
        self.collections.read().get(name).map(|c| c.entries.len())
    }
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().contains_key(name))
    }

    async fn create_collection(&self, name: &str, dims: usize) -> Result<CreateOutcome> {
        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        collections.insert(
            name.to_string(),
            Collection {
                dims,
                entries: Vec::new(),
            },
        );
        Ok(CreateOutcome::Created)
    }

    async fn add_documents(
        &self,
        collection: &CollectionRef,
        chunks: &[DocumentChunk],
        vectors: &[Vec<f32>],
    ) -> Result<usize> {
        if chunks.len() != vectors.len() {
            bail!(
                "chunk/vector count mismatch: {} chunks, {} vectors",
                chunks.len(),
                vectors.len()
            );
        }

        let mut collections = self.collections.write();
        let target = match collections.get_mut(collection.name()) {
            Some(c) => c,
            None => bail!("collection not found: {}", collection.name()),
        };

        // Check every vector before writing any, so a bad batch leaves no trace.
        if target.dims > 0 {
            if let Some(bad) = vectors.iter().find(|v| v.len() != target.dims) {
                bail!(
                    "vector dimension mismatch: expected {}, got {}",
                    target.dims,
                    bad.len()
                );
            }
        }

        target
            .entries
            .extend(chunks.iter().zip(vectors).map(|(c, v)| StoredChunk {
                chunk: c.clone(),
                vector: v.clone(),
            }));
        Ok(chunks.len())
    }

    async fn similarity_search_with_score(
        &self,
        collection: &CollectionRef,
        query_vec: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedPassage>> {
        let collections = self.collections.read();
        let source = match collections.get(collection.name()) {
            Some(c) => c,
            None => bail!("collection not found: {}", collection.name()),
        };

        let mut passages: Vec<RetrievedPassage> = source
            .entries
            .iter()
            .map(|sc| RetrievedPassage {
                text: sc.chunk.text.clone(),
                score: cosine_similarity(query_vec, &sc.vector),
                metadata: sc.chunk.metadata.clone(),
            })
            .collect();
        passages.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        passages.truncate(k);
        Ok(passages)
    }
}
