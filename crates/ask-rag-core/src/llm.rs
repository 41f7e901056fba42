//! Language model abstraction.
//!
//! The answerer talks to a model through [`ChatModel`]: one system
//! instruction plus one user turn in, plain text out. Concrete HTTP-backed
//! models live in the `ask-rag` app crate.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4.1"`).
    fn model_name(&self) -> &str;

    /// Invoke the model with a system instruction and a user turn, sent as
    /// two distinct messages. Returns the model's text response.
    async fn invoke(&self, system_instruction: &str, user_turn: &str) -> Result<String>;
}
