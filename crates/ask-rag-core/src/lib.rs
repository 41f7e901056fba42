//! # Ask-RAG Core
//!
//! Shared, runtime-free logic for Ask-RAG: data models, fixed-window text
//! splitting, tenant fingerprints, the vector-store and counter-store
//! abstractions with in-memory backends, and the embedding / chat model
//! traits.
//!
//! This crate contains no tokio, HTTP client, or filesystem I/O. Network
//! backends (Qdrant, OpenAI, Ollama, SQLite) live in the `ask-rag` app crate.

pub mod chunk;
pub mod counter;
pub mod embedding;
pub mod fingerprint;
pub mod llm;
pub mod models;
pub mod store;
