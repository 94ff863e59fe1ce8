use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Chunk, ChunkStats, ChunkedDocument, PageTextDocument};

static PARAGRAPH_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("valid paragraph boundary regex"));
static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+\s+").expect("valid sentence boundary regex"));

pub const DEFAULT_PREFERRED_MAX: usize = 1500;
pub const DEFAULT_ABSOLUTE_MAX: usize = 2500;
pub const CHUNKING_STRATEGY: &str = "semantic_preserving";

#[derive(Debug, Clone, Copy)]
pub struct ChunkConfig {
    pub preferred_max: usize,
    pub absolute_max: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            preferred_max: DEFAULT_PREFERRED_MAX,
            absolute_max: DEFAULT_ABSOLUTE_MAX,
        }
    }
}

/// Split one page of statutory text into semantically bounded chunks.
///
/// Paragraph boundaries are preferred split points; a paragraph longer than
/// `absolute_max` falls back to sentence boundaries. A single sentence longer
/// than `absolute_max` is kept intact: legal meaning outranks size limits.
pub fn chunk_page(
    text: &str,
    page_number: u32,
    preferred_max: usize,
    absolute_max: usize,
) -> Vec<Chunk> {
    let page_text = text.trim();
    if page_text.is_empty() {
        return Vec::new();
    }

    if char_len(page_text) <= preferred_max {
        return vec![build_chunk(page_number, 1, page_text)];
    }

    let mut pieces = Vec::<String>::new();
    let mut buffer = String::new();

    for paragraph in split_paragraphs(page_text) {
        if char_len(paragraph) > absolute_max {
            flush_buffer(&mut buffer, &mut pieces);
            accumulate_sentences(paragraph, absolute_max, &mut buffer, &mut pieces);
            continue;
        }

        // the "\n\n" joiner counts toward the limit
        if !buffer.is_empty() && char_len(&buffer) + 2 + char_len(paragraph) > preferred_max {
            flush_buffer(&mut buffer, &mut pieces);
        }
        if !buffer.is_empty() {
            buffer.push_str("\n\n");
        }
        buffer.push_str(paragraph);
    }
    flush_buffer(&mut buffer, &mut pieces);

    pieces
        .iter()
        .enumerate()
        .map(|(index, piece)| build_chunk(page_number, index + 1, piece))
        .collect()
}

/// Chunk every page of a document and compute corpus stats.
pub fn chunk_document(document: &PageTextDocument, config: ChunkConfig) -> ChunkedDocument {
    let mut chunks = Vec::<Chunk>::new();
    for page in &document.pages {
        chunks.extend(chunk_page(
            &page.text,
            page.page_number,
            config.preferred_max,
            config.absolute_max,
        ));
    }

    let stats = compute_stats(&chunks);

    ChunkedDocument {
        document_id: document.document_id.clone(),
        total_chunks: chunks.len(),
        chunking_strategy: CHUNKING_STRATEGY.to_string(),
        preferred_max_size: config.preferred_max,
        absolute_max_size: config.absolute_max,
        stats,
        chunks,
    }
}

fn compute_stats(chunks: &[Chunk]) -> ChunkStats {
    if chunks.is_empty() {
        return ChunkStats {
            total_chunks: 0,
            max_chunk_size: 0,
            min_chunk_size: 0,
            avg_chunk_size: 0,
        };
    }

    let sizes = chunks.iter().map(|chunk| chunk.char_count);
    let total: usize = sizes.clone().sum();
    ChunkStats {
        total_chunks: chunks.len(),
        max_chunk_size: sizes.clone().max().unwrap_or(0),
        min_chunk_size: sizes.min().unwrap_or(0),
        avg_chunk_size: total / chunks.len(),
    }
}

fn accumulate_sentences(
    paragraph: &str,
    absolute_max: usize,
    buffer: &mut String,
    pieces: &mut Vec<String>,
) {
    for sentence in split_sentences(paragraph) {
        // the space joiner counts toward the limit
        if !buffer.is_empty() && char_len(buffer) + 1 + char_len(sentence) > absolute_max {
            flush_buffer(buffer, pieces);
        }
        if !buffer.is_empty() {
            buffer.push(' ');
        }
        buffer.push_str(sentence);
    }
}

fn flush_buffer(buffer: &mut String, pieces: &mut Vec<String>) {
    let flushed = std::mem::take(buffer);
    let trimmed = flushed.trim();
    if !trimmed.is_empty() {
        pieces.push(trimmed.to_string());
    }
}

fn build_chunk(page_number: u32, sequence: usize, text: &str) -> Chunk {
    Chunk {
        chunk_id: format!("page_{page_number}_chunk_{sequence}"),
        page_number,
        text: text.to_string(),
        char_count: char_len(text),
    }
}

fn split_paragraphs(page_text: &str) -> Vec<&str> {
    PARAGRAPH_BOUNDARY
        .split(page_text)
        .map(str::trim)
        .filter(|paragraph| !paragraph.is_empty())
        .collect()
}

fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for found in SENTENCE_BOUNDARY.find_iter(paragraph) {
        let sentence = paragraph[start..found.end()].trim();
        if !sentence.is_empty() {
            sentences.push(sentence);
        }
        start = found.end();
    }
    let tail = paragraph[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
