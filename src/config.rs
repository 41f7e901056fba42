//! TOML configuration.
//!
//! Only `[server]` is required; every other section falls back to the
//! defaults below. See `config/askrag.example.toml` for a full example.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub intake: IntakeConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub vector_store: VectorStoreConfig,
    #[serde(default)]
    pub counter_store: CounterStoreConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Name of the environment variable holding the shared API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_api_key_env() -> String {
    "BACKEND_API_KEY".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct IntakeConfig {
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    #[serde(default = "default_read_chunk_bytes")]
    pub read_chunk_bytes: usize,
    /// Directory for upload temp files. Defaults to the OS temp dir.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
    #[serde(default = "default_temp_prefix")]
    pub temp_prefix: String,
    #[serde(default = "default_temp_suffix")]
    pub temp_suffix: String,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            read_chunk_bytes: default_read_chunk_bytes(),
            temp_dir: None,
            temp_prefix: default_temp_prefix(),
            temp_suffix: default_temp_suffix(),
        }
    }
}

fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}
fn default_read_chunk_bytes() -> usize {
    8192
}
fn default_temp_prefix() -> String {
    "ask_rag_".to_string()
}
fn default_temp_suffix() -> String {
    "_temp".to_string()
}

/// A fixed-window request budget.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u64,
    pub window_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_ingest_policy")]
    pub ingest: RateLimitPolicy,
    #[serde(default = "default_ask_policy")]
    pub ask: RateLimitPolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            ingest: default_ingest_policy(),
            ask: default_ask_policy(),
        }
    }
}

fn default_ingest_policy() -> RateLimitPolicy {
    RateLimitPolicy {
        max_requests: 5,
        window_secs: 86_400,
    }
}
fn default_ask_policy() -> RateLimitPolicy {
    RateLimitPolicy {
        max_requests: 20,
        window_secs: 86_400,
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_relevance_threshold")]
    pub relevance_threshold: f32,
    /// Render retrieval failures as an apology answer instead of a 500.
    #[serde(default = "default_soft_fail")]
    pub soft_fail: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            relevance_threshold: default_relevance_threshold(),
            soft_fail: default_soft_fail(),
        }
    }
}

fn default_top_k() -> usize {
    5
}
fn default_relevance_threshold() -> f32 {
    0.60
}
fn default_soft_fail() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL override (OpenAI-compatible gateway or Ollama host).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            model: None,
            dims: None,
            url: None,
            batch_size: 64,
            max_retries: 5,
            timeout_secs: 30,
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_llm_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            url: None,
            max_retries: default_llm_max_retries(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_provider() -> String {
    "openai".to_string()
}
fn default_llm_model() -> String {
    "gpt-4.1".to_string()
}
fn default_llm_max_retries() -> u32 {
    3
}
fn default_llm_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct VectorStoreConfig {
    #[serde(default = "default_memory_backend")]
    pub backend: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Name of the environment variable holding the Qdrant API key, if any.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            url: None,
            api_key_env: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CounterStoreConfig {
    #[serde(default = "default_memory_backend")]
    pub backend: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for CounterStoreConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            path: None,
        }
    }
}

fn default_memory_backend() -> String {
    "memory".to_string()
}

/// Read and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Parse and validate config from a TOML string.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate intake
    if config.intake.max_file_bytes == 0 {
        anyhow::bail!("intake.max_file_bytes must be > 0");
    }
    if config.intake.read_chunk_bytes == 0 {
        anyhow::bail!("intake.read_chunk_bytes must be > 0");
    }

    // Validate rate limits
    for (name, policy) in [
        ("ingest", &config.rate_limit.ingest),
        ("ask", &config.rate_limit.ask),
    ] {
        if policy.max_requests == 0 {
            anyhow::bail!("rate_limit.{}.max_requests must be >= 1", name);
        }
        if policy.window_secs == 0 {
            anyhow::bail!("rate_limit.{}.window_secs must be >= 1", name);
        }
    }

    // Validate chunking
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.chunk_overlap must be < chunking.chunk_size");
    }

    // Validate retrieval
    if config.retrieval.top_k < 1 {
        anyhow::bail!("retrieval.top_k must be >= 1");
    }
    if !(-1.0..=1.0).contains(&config.retrieval.relevance_threshold) {
        anyhow::bail!("retrieval.relevance_threshold must be in [-1.0, 1.0]");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }
    if config.embedding.is_enabled() {
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_none() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.batch_size == 0 {
            anyhow::bail!("embedding.batch_size must be > 0");
        }
    }

    // Validate llm
    match config.llm.provider.as_str() {
        "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be openai or ollama.",
            other
        ),
    }

    // Validate backends
    match config.vector_store.backend.as_str() {
        "memory" => {}
        "qdrant" => {
            if config.vector_store.url.is_none() {
                anyhow::bail!("vector_store.url must be specified when backend is 'qdrant'");
            }
        }
        other => anyhow::bail!(
            "Unknown vector_store backend: '{}'. Must be memory or qdrant.",
            other
        ),
    }
    match config.counter_store.backend.as_str() {
        "memory" => {}
        "sqlite" => {
            if config.counter_store.path.is_none() {
                anyhow::bail!("counter_store.path must be specified when backend is 'sqlite'");
            }
        }
        other => anyhow::bail!(
            "Unknown counter_store backend: '{}'. Must be memory or sqlite.",
            other
        ),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[server]
bind = "127.0.0.1:8000"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = parse_config(MINIMAL).unwrap();
        assert_eq!(config.server.api_key_env, "BACKEND_API_KEY");
        assert_eq!(config.intake.max_file_bytes, 10 * 1024 * 1024);
        assert_eq!(config.intake.read_chunk_bytes, 8192);
        assert_eq!(config.intake.temp_prefix, "ask_rag_");
        assert_eq!(config.rate_limit.ingest.max_requests, 5);
        assert_eq!(config.rate_limit.ask.max_requests, 20);
        assert_eq!(config.rate_limit.ask.window_secs, 86_400);
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.retrieval.top_k, 5);
        assert!((config.retrieval.relevance_threshold - 0.60).abs() < f32::EPSILON);
        assert!(config.retrieval.soft_fail);
        assert!(!config.embedding.is_enabled());
        assert_eq!(config.llm.model, "gpt-4.1");
        assert_eq!(config.vector_store.backend, "memory");
        assert_eq!(config.counter_store.backend, "memory");
    }

    #[test]
    fn test_overrides() {
        let config = parse_config(
            r#"
[server]
bind = "0.0.0.0:9000"

[rate_limit.ingest]
max_requests = 2
window_secs = 60

[retrieval]
relevance_threshold = 0.4

[embedding]
provider = "ollama"
model = "nomic-embed-text"
dims = 768

[vector_store]
backend = "qdrant"
url = "http://localhost:6333"
"#,
        )
        .unwrap();
        assert_eq!(
            config.rate_limit.ingest,
            RateLimitPolicy {
                max_requests: 2,
                window_secs: 60
            }
        );
        assert_eq!(config.rate_limit.ask.max_requests, 20);
        assert!((config.retrieval.relevance_threshold - 0.4).abs() < f32::EPSILON);
        assert_eq!(config.embedding.dims, Some(768));
        assert_eq!(config.vector_store.url.as_deref(), Some("http://localhost:6333"));
    }

    #[test]
    fn test_rejects_overlap_not_below_size() {
        let err = parse_config(&format!(
            "{}\n[chunking]\nchunk_size = 100\nchunk_overlap = 100\n",
            MINIMAL
        ))
        .unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn test_rejects_enabled_embedding_without_dims() {
        let err = parse_config(&format!(
            "{}\n[embedding]\nprovider = \"openai\"\nmodel = \"text-embedding-3-small\"\n",
            MINIMAL
        ))
        .unwrap_err();
        assert!(err.to_string().contains("embedding.dims"));
    }

    #[test]
    fn test_rejects_unknown_backends() {
        let err = parse_config(&format!(
            "{}\n[vector_store]\nbackend = \"astra\"\n",
            MINIMAL
        ))
        .unwrap_err();
        assert!(err.to_string().contains("Unknown vector_store backend"));

        let err = parse_config(&format!(
            "{}\n[counter_store]\nbackend = \"sqlite\"\n",
            MINIMAL
        ))
        .unwrap_err();
        assert!(err.to_string().contains("counter_store.path"));
    }

    #[test]
    fn test_rejects_zero_rate_limit() {
        let err = parse_config(&format!(
            "{}\n[rate_limit.ask]\nmax_requests = 0\nwindow_secs = 10\n",
            MINIMAL
        ))
        .unwrap_err();
        assert!(err.to_string().contains("rate_limit.ask.max_requests"));
    }

    #[test]
    fn test_example_config_parses() {
        let config = parse_config(include_str!("../config/askrag.example.toml")).unwrap();
        assert_eq!(config.vector_store.backend, "qdrant");
        assert_eq!(config.embedding.dims, Some(1536));
    }

    #[test]
    fn test_load_config_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("askrag.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        assert_eq!(load_config(&path).unwrap().server.bind, "127.0.0.1:8000");

        let err = load_config(&dir.path().join("missing.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_missing_server_section_fails() {
        assert!(parse_config("[retrieval]\ntop_k = 3\n").is_err());
    }
}
