use std::cmp::Ordering;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::enhancer::QueryEnhancer;
use crate::model::{ChunkedDocument, EmbeddedChunk, EmbeddedIndexFile, SearchResult};
use crate::semantic::{Embedder, cosine_similarity};

/// An immutable embedded-chunk index. Built or loaded once, then threaded
/// explicitly through every search call; `&self` access is read-only, so
/// concurrent searches need no locking.
#[derive(Debug, Clone)]
pub struct EmbeddedIndex {
    document_id: String,
    embedding_model: String,
    embedding_dimensions: usize,
    chunks: Vec<EmbeddedChunk>,
}

impl EmbeddedIndex {
    /// Embed every chunk of a chunked document. Index-build time is the only
    /// point embeddings are produced; they are read-only afterward.
    pub fn build(document: &ChunkedDocument, embedder: &dyn Embedder) -> Self {
        let chunks = document
            .chunks
            .iter()
            .map(|chunk| EmbeddedChunk {
                chunk_id: chunk.chunk_id.clone(),
                page_number: chunk.page_number,
                text: chunk.text.clone(),
                char_count: chunk.char_count,
                embedding: embedder.embed(&chunk.text),
            })
            .collect();

        Self {
            document_id: document.document_id.clone(),
            embedding_model: embedder.model_id().to_string(),
            embedding_dimensions: embedder.dimensions(),
            chunks,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file: EmbeddedIndexFile = crate::util::read_json(path)
            .with_context(|| format!("failed to load embedded index: {}", path.display()))?;

        for chunk in &file.chunks {
            if chunk.embedding.len() != file.embedding_dimensions {
                bail!(
                    "embedding dimension mismatch in {} for chunk {}: expected {}, found {}",
                    path.display(),
                    chunk.chunk_id,
                    file.embedding_dimensions,
                    chunk.embedding.len()
                );
            }
        }

        Ok(Self {
            document_id: file.document_id,
            embedding_model: file.embedding_model,
            embedding_dimensions: file.embedding_dimensions,
            chunks: file.chunks,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        crate::util::write_json_pretty(path, &self.to_file())
    }

    fn to_file(&self) -> EmbeddedIndexFile {
        EmbeddedIndexFile {
            document_id: self.document_id.clone(),
            total_chunks: self.chunks.len(),
            embedding_model: self.embedding_model.clone(),
            embedding_dimensions: self.embedding_dimensions,
            chunks: self.chunks.clone(),
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    pub fn embedding_dimensions(&self) -> usize {
        self.embedding_dimensions
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Rank every indexed chunk by cosine similarity against the (optionally
    /// enhanced) query and return the top `top_k`. Ties on similarity break
    /// ascending by chunk_id so rankings are reproducible across runs.
    pub fn search(
        &self,
        query: &str,
        top_k: usize,
        skip_enhancement: bool,
        enhancer: &QueryEnhancer,
        embedder: &dyn Embedder,
    ) -> Vec<SearchResult> {
        let query_text = if skip_enhancement {
            query.to_string()
        } else {
            enhancer.enhance(query)
        };
        let query_embedding = embedder.embed(&query_text);

        let mut results = self
            .chunks
            .iter()
            .map(|chunk| SearchResult {
                chunk_id: chunk.chunk_id.clone(),
                page_number: chunk.page_number,
                text: chunk.text.clone(),
                char_count: chunk.char_count,
                similarity: cosine_similarity(&query_embedding, &chunk.embedding),
            })
            .collect::<Vec<SearchResult>>();

        results.sort_by(|left, right| {
            right
                .similarity
                .partial_cmp(&left.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| left.chunk_id.cmp(&right.chunk_id))
        });
        results.truncate(top_k);
        results
    }
}
