//! Text embedding with rate-limit retry.
//!
//! Failures never escape: each call produces an `EmbeddingOutcome`, and
//! chunks whose embedding failed are left for the retriever to exclude.

use futures::stream::{self, StreamExt};
use std::sync::Arc;

use crate::protocol::{Chunk, EmbeddingOutcome};
use crate::providers::EmbeddingProvider;
use crate::retry::{with_retry, RetryPolicy};
use crate::settings::EmbeddingSettings;

/// Collapse all whitespace runs to single spaces, trim, and cap the length
/// at `max_chars` characters.
pub fn clean_embedding_input(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => collapsed[..byte_idx].trim_end().to_string(),
        None => collapsed,
    }
}

pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    retry: RetryPolicy,
    dimension: usize,
    max_input_chars: usize,
    concurrency: usize,
}

impl Embedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, settings: &EmbeddingSettings) -> Self {
        Self {
            provider,
            retry: settings.retry_policy(),
            dimension: settings.dimension,
            max_input_chars: settings.max_input_chars,
            concurrency: settings.concurrency.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Embed one text. Empty input is the zero vector, with no service call.
    pub async fn embed(&self, text: &str) -> EmbeddingOutcome {
        let input = clean_embedding_input(text, self.max_input_chars);
        if input.is_empty() {
            return EmbeddingOutcome::Vector(vec![0.0; self.dimension]);
        }

        let result = with_retry(&self.retry, "embedding", || self.provider.embed(&input)).await;
        match result {
            Ok(vector) if vector.len() == self.dimension => EmbeddingOutcome::Vector(vector),
            Ok(vector) => {
                let reason = format!(
                    "expected {} dimensions, service returned {}",
                    self.dimension,
                    vector.len()
                );
                log::warn!("[Embedder] {}", reason);
                EmbeddingOutcome::Failed { reason }
            }
            Err(e) => {
                log::warn!("[Embedder] Embedding failed: {}", e);
                EmbeddingOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Embed every chunk, `concurrency` at a time, storing outcomes in place.
    ///
    /// Returns the number of chunks whose embedding failed.
    pub async fn embed_chunks(&self, chunks: &mut [Chunk]) -> usize {
        let outcomes: Vec<EmbeddingOutcome> = stream::iter(chunks.iter())
            .map(|chunk| self.embed(&chunk.text))
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut failed = 0;
        for (chunk, outcome) in chunks.iter_mut().zip(outcomes) {
            if outcome.is_failed() {
                failed += 1;
            }
            chunk.embedding = Some(outcome);
        }
        failed
    }
}
