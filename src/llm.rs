//! Chat model implementations.
//!
//! Both send the system instruction and the user turn as two messages and
//! return the assistant text unchanged. Retry and backoff follow
//! [`crate::http`].

use std::sync::Arc;

use anyhow::{bail, Result};
use ask_rag_core::llm::ChatModel;
use async_trait::async_trait;

use crate::config::LlmConfig;
use crate::http::{build_client, post_json_with_retry};

const OPENAI_DEFAULT_URL: &str = "https://api.openai.com";
const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

pub fn create_chat_model(config: &LlmConfig) -> Result<Arc<dyn ChatModel>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAIChatModel::new(config)?)),
        "ollama" => Ok(Arc::new(OllamaChatModel::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

fn messages(system_instruction: &str, user_turn: &str) -> serde_json::Value {
    serde_json::json!([
        {"role": "system", "content": system_instruction},
        {"role": "user", "content": user_turn},
    ])
}

/// OpenAI chat completions (`POST /v1/chat/completions`).
pub struct OpenAIChatModel {
    model: String,
    base_url: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIChatModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self {
            model: config.model.clone(),
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_DEFAULT_URL.to_string()),
            api_key,
            max_retries: config.max_retries,
            client: build_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, system_instruction: &str, user_turn: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages(system_instruction, user_turn),
        });
        tracing::debug!(model = %self.model, "openai chat completion");
        let json = post_json_with_retry(
            &self.client,
            &format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/')),
            Some(&self.api_key),
            &body,
            self.max_retries,
            "OpenAI",
        )
        .await?;
        parse_openai_chat(&json)
    }
}

fn parse_openai_chat(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].message.content"))
}

/// Ollama chat (`POST /api/chat`, non-streaming).
pub struct OllamaChatModel {
    model: String,
    url: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OllamaChatModel {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            model: config.model.clone(),
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_DEFAULT_URL.to_string()),
            max_retries: config.max_retries,
            client: build_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl ChatModel for OllamaChatModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn invoke(&self, system_instruction: &str, user_turn: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages(system_instruction, user_turn),
            "stream": false,
        });
        tracing::debug!(model = %self.model, "ollama chat");
        let json = post_json_with_retry(
            &self.client,
            &format!("{}/api/chat", self.url.trim_end_matches('/')),
            None,
            &body,
            self.max_retries,
            "Ollama",
        )
        .await?;
        parse_ollama_chat(&json)
    }
}

fn parse_ollama_chat(json: &serde_json::Value) -> Result<String> {
    json.pointer("/message/content")
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing message.content"))
}
