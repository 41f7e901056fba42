//! Wiring: build every collaborator once from config and hand out the
//! orchestrators.

use std::sync::Arc;

use anyhow::Result;
use ask_rag_core::chunk::TextSplitter;
use ask_rag_core::counter::{CounterStore, InMemoryCounterStore};
use ask_rag_core::embedding::EmbeddingProvider;
use ask_rag_core::llm::ChatModel;
use ask_rag_core::store::{InMemoryVectorStore, VectorStore};

use crate::config::Config;
use crate::embedding::create_provider;
use crate::ingest::IngestionPipeline;
use crate::intake::IntakeOrchestrator;
use crate::llm::create_chat_model;
use crate::loader::{DocumentLoader, PdfLoader};
use crate::qdrant::QdrantStore;
use crate::query::QueryOrchestrator;
use crate::rate_limit::RateLimiter;
use crate::retrieval::RetrievalAnswerer;
use crate::sqlite_counter::SqliteCounterStore;
use crate::tenant::TenantCollectionManager;

/// The collaborators the orchestrators depend on.
pub struct Collaborators {
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub model: Arc<dyn ChatModel>,
    pub vectors: Arc<dyn VectorStore>,
    pub counters: Arc<dyn CounterStore>,
    pub loader: Arc<dyn DocumentLoader>,
}

impl Collaborators {
    /// Build the collaborators named in `config`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let embedder = create_provider(&config.embedding)?;
        let model = create_chat_model(&config.llm)?;

        let vectors: Arc<dyn VectorStore> = match config.vector_store.backend.as_str() {
            "qdrant" => Arc::new(QdrantStore::from_config(&config.vector_store)?),
            _ => Arc::new(InMemoryVectorStore::new()),
        };

        let counters: Arc<dyn CounterStore> = match (
            config.counter_store.backend.as_str(),
            &config.counter_store.path,
        ) {
            ("sqlite", Some(path)) => Arc::new(SqliteCounterStore::connect(path).await?),
            ("sqlite", None) => anyhow::bail!("counter_store.path required for sqlite backend"),
            _ => Arc::new(InMemoryCounterStore::new()),
        };

        tracing::debug!(
            embedding = embedder.model_name(),
            llm = model.model_name(),
            vector_store = vectors.backend_name(),
            counter_store = counters.backend_name(),
            "collaborators ready"
        );

        Ok(Self {
            embedder,
            model,
            vectors,
            counters,
            loader: Arc::new(PdfLoader),
        })
    }
}

#[derive(Clone)]
pub struct AppServices {
    pub intake: Arc<IntakeOrchestrator>,
    pub query: Arc<QueryOrchestrator>,
}

impl AppServices {
    pub async fn from_config(config: &Config) -> Result<Self> {
        let collaborators = Collaborators::from_config(config).await?;
        Ok(Self::assemble(config, collaborators))
    }

    /// Build the orchestrators around already-constructed collaborators.
    pub fn assemble(config: &Config, c: Collaborators) -> Self {
        let tenants = TenantCollectionManager::new(c.vectors, c.embedder.clone());
        let limiter = RateLimiter::new(c.counters);

        let pipeline = IngestionPipeline::new(
            c.loader,
            TextSplitter::new(config.chunking.chunk_size, config.chunking.chunk_overlap),
            c.embedder.clone(),
            tenants.clone(),
            config.embedding.batch_size,
        );
        let intake = IntakeOrchestrator::new(
            &config.intake,
            config.rate_limit.ingest,
            limiter.clone(),
            Arc::new(pipeline),
        );

        let answerer = RetrievalAnswerer::new(tenants, c.embedder, c.model, &config.retrieval);
        let query = QueryOrchestrator::new(
            config.rate_limit.ask,
            limiter,
            Arc::new(answerer),
            config.retrieval.soft_fail,
        );

        Self {
            intake: Arc::new(intake),
            query: Arc::new(query),
        }
    }
}
