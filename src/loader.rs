//! Document loading.
//!
//! Loaders are synchronous and may be CPU-heavy; the ingestion pipeline
//! runs them on `spawn_blocking`.

use std::path::Path;

use anyhow::{Context, Result};
use ask_rag_core::models::Page;

pub trait DocumentLoader: Send + Sync {
    /// Read the file at `path` into pages, in document order.
    fn load(&self, path: &Path) -> Result<Vec<Page>>;
}

/// PDF text extraction via `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfLoader;

impl DocumentLoader for PdfLoader {
    fn load(&self, path: &Path) -> Result<Vec<Page>> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let texts = pdf_extract::extract_text_from_mem_by_pages(&bytes)
            .map_err(|e| anyhow::anyhow!("PDF extraction failed: {}", e))?;
        Ok(texts
            .into_iter()
            .enumerate()
            .map(|(number, text)| Page { number, text })
            .collect())
    }
}
