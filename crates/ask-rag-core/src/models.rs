//! Core data models shared by the ingestion and retrieval pipelines.

use serde::{Deserialize, Serialize};

/// One page of a loaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 0-based page number within the source document.
    pub number: usize,
    pub text: String,
}

/// Where a chunk came from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// Source document label (usually the temp file path or original filename).
    pub source: String,
    /// 0-based page the chunk was cut from.
    pub page: usize,
    /// Byte offset of the chunk within its page text.
    pub position: usize,
    /// Index of the chunk within the whole document.
    pub chunk_index: usize,
}

/// A bounded, overlapping slice of a document's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// A passage returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub text: String,
    /// Similarity score reported by the store (cosine, higher is closer).
    pub score: f32,
    #[serde(default)]
    pub metadata: ChunkMetadata,
}

/// Result of a successful ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub pages: usize,
    pub chunks: usize,
    /// File size in bytes.
    pub size: u64,
}
