//! Token-count chunking of extracted document text.
//!
//! Tokens are whitespace-delimited words. Chunks keep the original token order,
//! never overlap, and are rejoined with single spaces, so the table marker
//! (`=== TABLE ===`) survives chunking intact.

use std::sync::Arc;

use crate::protocol::{Chunk, Document};

/// Default number of tokens per chunk
pub const DEFAULT_CHUNK_TOKENS: usize = 1000;

/// Split text into chunks of at most `max_tokens` whitespace tokens.
///
/// The final partial chunk is kept even when it is short. Empty or
/// whitespace-only input yields no chunks. A `max_tokens` of zero is treated
/// as one token per chunk.
pub fn split_text_into_token_chunks(text: &str, max_tokens: usize) -> Vec<String> {
    let max_tokens = max_tokens.max(1);
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::with_capacity(max_tokens);

    for token in text.split_whitespace() {
        current.push(token);
        if current.len() >= max_tokens {
            chunks.push(current.join(" "));
            current.clear();
        }
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}

/// Chunk one document's validated text.
pub fn chunk_document(document: &Arc<Document>, text: &str, max_tokens: usize) -> Vec<Chunk> {
    split_text_into_token_chunks(text, max_tokens)
        .into_iter()
        .enumerate()
        .map(|(index, chunk_text)| Chunk::new(chunk_text, Arc::clone(document), index))
        .collect()
}
