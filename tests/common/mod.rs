//! Shared fixtures for integration tests: deterministic collaborators and a
//! config rooted in a temp directory.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use ask_rag::config::{parse_config, Config};
use ask_rag::loader::{DocumentLoader, PdfLoader};
use ask_rag::services::{AppServices, Collaborators};
use ask_rag_core::counter::{Clock, InMemoryCounterStore};
use ask_rag_core::embedding::EmbeddingProvider;
use ask_rag_core::llm::ChatModel;
use ask_rag_core::models::Page;
use ask_rag_core::store::InMemoryVectorStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

pub const KEYWORDS: [&str; 4] = ["tax", "garden", "invoice", "rust"];

/// Embeds text as keyword counts, plus one "other" axis for text with no
/// keywords. Cosine similarity is 1.0 for texts sharing exactly one
/// keyword and 0.0 across different keywords.
pub struct KeywordEmbedder;

impl KeywordEmbedder {
    pub fn vector(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut v: Vec<f32> = KEYWORDS
            .iter()
            .map(|k| lower.matches(k).count() as f32)
            .collect();
        let other = if v.iter().all(|x| *x == 0.0) { 1.0 } else { 0.0 };
        v.push(other);
        v
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword"
    }
    fn dims(&self) -> usize {
        KEYWORDS.len() + 1
    }
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

/// Chat model that records the system instruction and echoes the question.
#[derive(Default)]
pub struct RecordingModel {
    pub systems: Mutex<Vec<String>>,
    pub fail_with: Option<&'static str>,
}

impl RecordingModel {
    pub fn failing(message: &'static str) -> Self {
        Self {
            systems: Mutex::new(Vec::new()),
            fail_with: Some(message),
        }
    }

    pub fn last_system(&self) -> Option<String> {
        self.systems.lock().last().cloned()
    }
}

#[async_trait]
impl ChatModel for RecordingModel {
    fn model_name(&self) -> &str {
        "recording"
    }
    async fn invoke(&self, system_instruction: &str, user_turn: &str) -> Result<String> {
        if let Some(msg) = self.fail_with {
            anyhow::bail!("{}", msg);
        }
        self.systems.lock().push(system_instruction.to_string());
        Ok(format!("answer: {}", user_turn))
    }
}

/// Treats the uploaded bytes as UTF-8 text, one page per form feed.
pub struct TextPagesLoader;

impl DocumentLoader for TextPagesLoader {
    fn load(&self, path: &Path) -> Result<Vec<Page>> {
        let text = std::fs::read_to_string(path)?;
        Ok(text
            .split('\u{c}')
            .enumerate()
            .map(|(number, t)| Page {
                number,
                text: t.to_string(),
            })
            .collect())
    }
}

pub struct Harness {
    pub services: AppServices,
    pub vectors: Arc<InMemoryVectorStore>,
    pub counters: Arc<InMemoryCounterStore>,
    pub model: Arc<RecordingModel>,
    pub config: Config,
    pub temp: TempDir,
}

impl Harness {
    pub fn upload_dir(&self) -> std::path::PathBuf {
        self.temp.path().join("uploads")
    }

    /// Files currently left in the upload temp dir.
    pub fn leftover_uploads(&self) -> usize {
        std::fs::read_dir(self.upload_dir())
            .map(|d| d.count())
            .unwrap_or(0)
    }
}

pub struct HarnessBuilder {
    extra_toml: String,
    intake_toml: String,
    model: RecordingModel,
    loader: Arc<dyn DocumentLoader>,
    clock: Option<Arc<dyn Clock>>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            extra_toml: String::new(),
            intake_toml: String::new(),
            model: RecordingModel::default(),
            loader: Arc::new(TextPagesLoader),
            clock: None,
        }
    }

    pub fn toml(mut self, extra: &str) -> Self {
        self.extra_toml.push_str(extra);
        self.extra_toml.push('\n');
        self
    }

    /// Extra keys for the `[intake]` table, which the harness always emits.
    pub fn intake(mut self, lines: &str) -> Self {
        self.intake_toml.push_str(lines);
        self.intake_toml.push('\n');
        self
    }

    pub fn model(mut self, model: RecordingModel) -> Self {
        self.model = model;
        self
    }

    pub fn pdf_loader(self) -> Self {
        self.loader(Arc::new(PdfLoader))
    }

    pub fn loader(mut self, loader: Arc<dyn DocumentLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Harness {
        let temp = TempDir::new().unwrap();
        let uploads = temp.path().join("uploads");
        std::fs::create_dir_all(&uploads).unwrap();

        let toml = format!(
            r#"
[server]
bind = "127.0.0.1:0"

[intake]
temp_dir = "{}"
{}

{}
"#,
            uploads.display(),
            self.intake_toml,
            self.extra_toml
        );
        let config = parse_config(&toml).unwrap();

        let vectors = Arc::new(InMemoryVectorStore::new());
        let counters = Arc::new(match self.clock {
            Some(clock) => InMemoryCounterStore::with_clock(clock),
            None => InMemoryCounterStore::new(),
        });
        let model = Arc::new(self.model);

        let services = AppServices::assemble(
            &config,
            Collaborators {
                embedder: Arc::new(KeywordEmbedder),
                model: model.clone(),
                vectors: vectors.clone(),
                counters: counters.clone(),
                loader: self.loader,
            },
        );

        Harness {
            services,
            vectors,
            counters,
            model,
            config,
            temp,
        }
    }
}

/// Minimal valid single-page PDF showing `phrase` in Helvetica.
/// Builds the body first, then an xref with correct byte offsets.
pub fn minimal_pdf_with_phrase(phrase: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", phrase);
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
            content.len(),
            content
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4, o5] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}
