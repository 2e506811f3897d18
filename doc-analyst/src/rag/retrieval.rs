//! Cosine-similarity ranking of embedded chunks against a query.

use crate::protocol::{Chunk, ScoredChunk};

/// Calculate cosine similarity between two vectors.
///
/// Mismatched lengths, empty or zero vectors, and non-finite results all
/// score 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot_product / (norm_a * norm_b);
    if similarity.is_finite() {
        similarity
    } else {
        0.0
    }
}

/// Rank chunks by similarity to `query`, best first, keeping the top `top_k`.
///
/// Chunks without a usable embedding are left out. The sort is stable, so
/// equal scores keep their insertion order.
pub fn rank_chunks<'a>(query: &[f32], chunks: &'a [Chunk], top_k: usize) -> Vec<ScoredChunk<'a>> {
    let mut results: Vec<ScoredChunk<'a>> = chunks
        .iter()
        .filter_map(|chunk| {
            let vector = chunk.embedding.as_ref()?.vector()?;
            Some(ScoredChunk {
                chunk,
                similarity: cosine_similarity(query, vector),
            })
        })
        .collect();

    results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    results.truncate(top_k);
    results
}
