//! # Ask-RAG
//!
//! Per-user PDF ingestion and retrieval-augmented question answering.
//!
//! Every identity owns one vector collection, named by a fingerprint of the
//! identity. Uploads pass a two-phase validator before anything is parsed;
//! questions are answered by a language model primed with the caller's own
//! most relevant passages. Both paths are rate limited per identity.
//!
//! ## Architecture
//!
//! ```text
//!  POST /ingest                                  POST /ask
//!       │                                            │
//! ┌─────▼──────────────┐                   ┌─────────▼─────────┐
//! │ IntakeOrchestrator │                   │ QueryOrchestrator │
//! │ limit → validate   │                   │ limit → answer    │
//! └─────┬──────────────┘                   └─────────┬─────────┘
//!       ▼                                            ▼
//! ┌───────────────────┐   ┌────────────────┐  ┌──────────────────┐
//! │ IngestionPipeline │──▶│ tenant         │◀─│ RetrievalAnswerer│
//! │ load/split/embed  │   │ collections    │  │ search → prompt  │
//! └───────────────────┘   └────────────────┘  └──────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy with HTTP status mapping |
//! | [`validate`] | Header and content validation of uploads |
//! | [`rate_limit`] | Fixed-window per-identity rate limiting |
//! | [`tenant`] | Per-identity collection lifecycle |
//! | [`loader`] | PDF page extraction |
//! | [`ingest`] | Load, split, embed, store |
//! | [`retrieval`] | Retrieval-augmented answering |
//! | [`intake`] | Upload orchestration |
//! | [`query`] | Question orchestration |
//! | [`embedding`] | OpenAI / Ollama embedding providers |
//! | [`llm`] | OpenAI / Ollama chat models |
//! | [`qdrant`] | Qdrant REST vector store |
//! | [`sqlite_counter`] | SQLite counter store |
//! | [`auth`] | `X-API-KEY` guard |
//! | [`services`] | Collaborator wiring |
//! | [`server`] | HTTP server |

pub mod auth;
pub mod config;
pub mod embedding;
pub mod error;
mod http;
pub mod identity;
pub mod ingest;
pub mod intake;
pub mod llm;
pub mod loader;
pub mod qdrant;
pub mod query;
pub mod rate_limit;
pub mod retrieval;
pub mod server;
pub mod services;
pub mod sqlite_counter;
pub mod tenant;
pub mod validate;
