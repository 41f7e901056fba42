//! [`VectorStore`] backed by a Qdrant server over its REST API.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | exists | `GET /collections/{name}/exists` |
//! | create | `PUT /collections/{name}` (409 = already exists) |
//! | add | `PUT /collections/{name}/points?wait=true` |
//! | search | `POST /collections/{name}/points/search` |
//!
//! Points carry the chunk text under `page_content` and its
//! [`ChunkMetadata`] under `metadata`.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use ask_rag_core::models::{ChunkMetadata, DocumentChunk, RetrievedPassage};
use ask_rag_core::store::{CollectionRef, CreateOutcome, VectorStore};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::VectorStoreConfig;

pub struct QdrantStore {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct QdrantPoint {
    id: String,
    vector: Vec<f32>,
    payload: PointPayload,
}

#[derive(Serialize, Deserialize)]
struct PointPayload {
    page_content: String,
    #[serde(default)]
    metadata: ChunkMetadata,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<SearchEntry>,
}

#[derive(Deserialize)]
struct SearchEntry {
    score: f32,
    payload: Option<PointPayload>,
}

#[derive(Deserialize)]
struct ExistsResponse {
    result: ExistsResult,
}

#[derive(Deserialize)]
struct ExistsResult {
    exists: bool,
}

impl QdrantStore {
    pub fn new(url: &str, api_key: Option<&str>, timeout_secs: u64) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            headers.insert(
                HeaderName::from_static("api-key"),
                HeaderValue::from_str(key).context("invalid Qdrant API key")?,
            );
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .build()?;
        Ok(Self {
            http,
            base_url: url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &VectorStoreConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("vector_store.url required for qdrant backend"))?;
        let api_key = match &config.api_key_env {
            Some(var) => Some(
                std::env::var(var)
                    .with_context(|| format!("{} environment variable not set", var))?,
            ),
            None => None,
        };
        Self::new(url, api_key.as_deref(), config.timeout_secs)
    }

    fn collection_url(&self, name: &str) -> String {
        format!("{}/collections/{}", self.base_url, name)
    }
}

fn build_points(chunks: &[DocumentChunk], vectors: &[Vec<f32>]) -> Vec<QdrantPoint> {
    chunks
        .iter()
        .zip(vectors)
        .map(|(chunk, vector)| QdrantPoint {
            id: uuid::Uuid::new_v4().to_string(),
            vector: vector.clone(),
            payload: PointPayload {
                page_content: chunk.text.clone(),
                metadata: chunk.metadata.clone(),
            },
        })
        .collect()
}

fn into_passages(response: SearchResponse) -> Vec<RetrievedPassage> {
    response
        .result
        .into_iter()
        .filter_map(|entry| {
            entry.payload.map(|p| RetrievedPassage {
                text: p.page_content,
                score: entry.score,
                metadata: p.metadata,
            })
        })
        .collect()
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn backend_name(&self) -> &str {
        "qdrant"
    }

    async fn collection_exists(&self, name: &str) -> Result<bool> {
        let response = self
            .http
            .get(format!("{}/exists", self.collection_url(name)))
            .send()
            .await?;
        if !response.status().is_success() {
            bail!(
                "qdrant exists check failed ({}): {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }
        let body: ExistsResponse = response.json().await?;
        Ok(body.result.exists)
    }

    async fn create_collection(&self, name: &str, dims: usize) -> Result<CreateOutcome> {
        let body = serde_json::json!({
            "vectors": {
                "size": dims,
                "distance": "Cosine"
            }
        });
        let response = self
            .http
            .put(self.collection_url(name))
            .json(&body)
            .send()
            .await?;
        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(CreateOutcome::Created),
            StatusCode::CONFLICT => Ok(CreateOutcome::AlreadyExists),
            other => bail!(
                "qdrant collection error ({}): {}",
                other,
                response.text().await.unwrap_or_default()
            ),
        }
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
        if chunks.is_empty() {
            return Ok(0);
        }

        let body = serde_json::json!({ "points": build_points(chunks, vectors) });
        let response = self
            .http
            .put(format!("{}/points", self.collection_url(collection.name())))
            .query(&[("wait", "true")])
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            bail!(
                "qdrant upsert failed ({}): {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }
        Ok(chunks.len())
    }

    async fn similarity_search_with_score(
        &self,
        collection: &CollectionRef,
        query_vec: &[f32],
        k: usize,
    ) -> Result<Vec<RetrievedPassage>> {
        let body = serde_json::json!({
            "vector": query_vec,
            "limit": k,
            "with_payload": true,
        });
        let response = self
            .http
            .post(format!(
                "{}/points/search",
                self.collection_url(collection.name())
            ))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            bail!(
                "qdrant search failed ({}): {}",
                response.status(),
                response.text().await.unwrap_or_default()
            );
        }
        let body: SearchResponse = response.json().await?;
        Ok(into_passages(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_points_carry_text_and_metadata() {
        let chunks = vec![DocumentChunk {
            text: "hello".into(),
            metadata: ChunkMetadata {
                source: "doc.pdf".into(),
                page: 2,
                position: 10,
                chunk_index: 4,
            },
        }];
        let points = build_points(&chunks, &[vec![0.1, 0.2]]);
        let v = serde_json::to_value(&points).unwrap();
        assert_eq!(v[0]["payload"]["page_content"], "hello");
        assert_eq!(v[0]["payload"]["metadata"]["page"], 2);
        assert_eq!(v[0]["vector"].as_array().unwrap().len(), 2);
        assert!(uuid::Uuid::parse_str(v[0]["id"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_search_response_parsing() {
        let raw = json!({
            "result": [
                {"id": "a", "score": 0.91, "payload": {"page_content": "one", "metadata": {"source": "s", "page": 0, "position": 0, "chunk_index": 0}}},
                {"id": "b", "score": 0.42, "payload": {"page_content": "two"}},
                {"id": "c", "score": 0.10}
            ],
            "status": "ok",
            "time": 0.001
        });
        let resp: SearchResponse = serde_json::from_value(raw).unwrap();
        let passages = into_passages(resp);
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].text, "one");
        assert!((passages[0].score - 0.91).abs() < 1e-6);
        assert_eq!(passages[1].metadata, ChunkMetadata::default());
    }

    #[test]
    fn test_exists_response_parsing() {
        let resp: ExistsResponse =
            serde_json::from_value(json!({"result": {"exists": true}, "status": "ok"})).unwrap();
        assert!(resp.result.exists);
    }

    #[test]
    fn test_from_config_requires_url() {
        assert!(QdrantStore::from_config(&VectorStoreConfig::default()).is_err());
        let config = VectorStoreConfig {
            backend: "qdrant".into(),
            url: Some("http://localhost:6333/".into()),
            ..Default::default()
        };
        let store = QdrantStore::from_config(&config).unwrap();
        assert_eq!(store.collection_url("abc"), "http://localhost:6333/collections/abc");
    }
}
