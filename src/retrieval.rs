//! Retrieval-augmented answering.
//!
//! For an identity with a collection, the query is embedded and the top-k
//! passages above the relevance threshold are appended to the system
//! instruction as `Document:` blocks. Identities that never ingested
//! anything skip retrieval entirely and get a plain model answer.

use std::sync::Arc;

use ask_rag_core::embedding::EmbeddingProvider;
use ask_rag_core::llm::ChatModel;
use ask_rag_core::models::RetrievedPassage;

use crate::config::RetrievalConfig;
use crate::error::RetrievalError;
use crate::tenant::TenantCollectionManager;

const BASE_INSTRUCTION: &str = "\
You are a helpful AI assistant that answers the user's questions using the documents provided.
If no documents are provided, or the question is unrelated to them, answer from your own knowledge.
Think carefully before answering.

For example:
User: What is the capital of France? (unrelated to the documents, answer from general knowledge)
You: The capital of France is Paris.

User: How do I invest in stocks? (related to the documents, answer from them)
You: You can invest in stocks by opening a demat account with a stockbroker.
";

/// A generated answer.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    /// Passages that cleared the threshold and went into the prompt.
    pub passages_used: usize,
    /// Whether the identity had a collection to search.
    pub retrieved: bool,
}

impl Answer {
    /// The user-facing string for a failed answer.
    pub fn render_soft_failure(err: &RetrievalError) -> String {
        format!("An error occurred: {}", err)
    }
}

/// Build the system instruction from the admitted passages, in rank order.
pub fn compose_system_prompt(passages: &[RetrievedPassage]) -> String {
    let mut prompt = BASE_INSTRUCTION.to_string();
    for p in passages {
        prompt.push_str("\nDocument: ");
        prompt.push_str(&p.text);
        prompt.push('\n');
    }
    prompt
}

pub struct RetrievalAnswerer {
    tenants: TenantCollectionManager,
    embedder: Arc<dyn EmbeddingProvider>,
    model: Arc<dyn ChatModel>,
    top_k: usize,
    threshold: f32,
}

impl RetrievalAnswerer {
    pub fn new(
        tenants: TenantCollectionManager,
        embedder: Arc<dyn EmbeddingProvider>,
        model: Arc<dyn ChatModel>,
        config: &RetrievalConfig,
    ) -> Self {
        Self {
            tenants,
            embedder,
            model,
            top_k: config.top_k.max(1),
            threshold: config.relevance_threshold,
        }
    }

    pub async fn answer(&self, query: &str, identity: &str) -> Result<Answer, RetrievalError> {
        let collection = self.tenants.collection_handle(identity);
        let retrieved = self.tenants.exists(identity).await?;

        let mut admitted = Vec::new();
        if retrieved {
            let query_vec = self.embedder.embed_query(query).await?;
            let hits = self
                .tenants
                .store()
                .similarity_search_with_score(&collection, &query_vec, self.top_k)
                .await?;
            tracing::debug!(
                tenant = collection.name(),
                hits = hits.len(),
                threshold = self.threshold,
                "similarity search"
            );
            admitted = hits
                .into_iter()
                .filter(|p| p.score >= self.threshold)
                .collect();
        } else {
            tracing::debug!(tenant = collection.name(), "no collection; skipping retrieval");
        }

        let system = compose_system_prompt(&admitted);
        let text = self.model.invoke(&system, query).await?;

        tracing::info!(
            tenant = collection.name(),
            passages = admitted.len(),
            model = self.model.model_name(),
            "answered query"
        );

        Ok(Answer {
            text,
            passages_used: admitted.len(),
            retrieved,
        })
    }
}
