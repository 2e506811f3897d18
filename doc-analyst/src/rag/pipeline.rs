//! End-to-end question answering over a set of documents.
//!
//! Flow per query:
//! 1. Extract and validate each document (skip on failure)
//! 2. Chunk and embed the surviving documents
//! 3. Embed the query and rank chunks by cosine similarity
//! 4. Assemble the prompt from the top chunks and ask the synthesizer
//!
//! Nothing is cached between queries.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::errors::ProviderError;
use crate::protocol::{
    Chunk, Document, DocumentReport, DocumentStatus, EmbeddingOutcome, QueryOutcome, QueryReport,
    RetrievedContext, TOP_K,
};
use crate::providers::{CompletionProvider, CompletionRequest, EmbeddingProvider, OpenAiClient};
use crate::rag::context_builder::{assemble_prompt, describe_retrieved};
use crate::rag::document_chunker::chunk_document;
use crate::rag::embedder::Embedder;
use crate::rag::file_processor::TextExtractor;
use crate::rag::retrieval::rank_chunks;
use crate::settings::{AnalystSettings, SynthesisSettings};

pub struct QueryPipeline {
    extractor: TextExtractor,
    embedder: Embedder,
    completions: Arc<dyn CompletionProvider>,
    chunk_tokens: usize,
    synthesis: SynthesisSettings,
}

impl QueryPipeline {
    pub fn new(
        settings: &AnalystSettings,
        embeddings: Arc<dyn EmbeddingProvider>,
        completions: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            extractor: TextExtractor::new(settings.extraction.clone(), settings.ocr.clone()),
            embedder: Embedder::new(embeddings, &settings.embedding),
            completions,
            chunk_tokens: settings.chunking.max_tokens,
            synthesis: settings.synthesis.clone(),
        }
    }

    /// Pipeline backed by one OpenAI-compatible client for both services.
    pub fn from_settings(settings: &AnalystSettings) -> Result<Self, ProviderError> {
        let client = Arc::new(OpenAiClient::new(&settings.api)?);
        Ok(Self::new(settings, client.clone(), client))
    }

    /// Answer `query` from `paths`, returning the answer or a fixed error string.
    pub async fn answer_query(&self, query: &str, paths: &[PathBuf]) -> String {
        self.run_query(query, paths).await.outcome.into_response_text()
    }

    /// Answer `query` and report what happened to each document.
    pub async fn run_query(&self, query: &str, paths: &[PathBuf]) -> QueryReport {
        let query_id = Uuid::new_v4();
        let started = Instant::now();
        let mut documents = Vec::with_capacity(paths.len());
        let mut retrieved = Vec::new();

        log::info!(
            "[Pipeline] Query {} started with {} document(s)",
            query_id,
            paths.len()
        );
        let outcome = self
            .execute(query_id, query, paths, &mut documents, &mut retrieved)
            .await;
        let elapsed = started.elapsed();
        log::info!(
            "[Pipeline] Query {} finished in {:?}: {}",
            query_id,
            elapsed,
            outcome.summary()
        );

        QueryReport {
            query_id,
            outcome,
            documents,
            retrieved,
            elapsed,
        }
    }

    async fn execute(
        &self,
        query_id: Uuid,
        query: &str,
        paths: &[PathBuf],
        documents: &mut Vec<DocumentReport>,
        retrieved: &mut Vec<RetrievedContext>,
    ) -> QueryOutcome {
        if paths.is_empty() {
            return QueryOutcome::NoDocuments;
        }

        let mut chunks: Vec<Chunk> = Vec::new();
        for path in paths {
            let (report, mut doc_chunks) = self.process_document(query_id, path).await;
            documents.push(report);
            chunks.append(&mut doc_chunks);
        }

        if chunks.is_empty() {
            log::warn!("[Pipeline] Query {}: no analyzable content in any document", query_id);
            return QueryOutcome::NoAnalyzableContent;
        }
        if chunks
            .iter()
            .all(|c| c.embedding.as_ref().map_or(true, EmbeddingOutcome::is_failed))
        {
            log::error!(
                "[Pipeline] Query {}: all {} chunk embeddings failed",
                query_id,
                chunks.len()
            );
            return QueryOutcome::ProcessingFailed;
        }

        let query_vector = match self.embedder.embed(query).await {
            EmbeddingOutcome::Vector(v) => v,
            EmbeddingOutcome::Failed { reason } => {
                log::error!("[Pipeline] Query {}: query embedding failed: {}", query_id, reason);
                return QueryOutcome::ProcessingFailed;
            }
        };

        let ranked = rank_chunks(&query_vector, &chunks, TOP_K);
        for scored in &ranked {
            log::debug!(
                "[RAG] Query {}: {} chunk {} scored {:.4}",
                query_id,
                scored.chunk.document.source_name(),
                scored.chunk.index,
                scored.similarity
            );
        }
        retrieved.extend(ranked.iter().map(describe_retrieved));

        let request = CompletionRequest {
            messages: assemble_prompt(query, &ranked),
            temperature: self.synthesis.temperature,
            max_tokens: self.synthesis.max_tokens,
        };
        match self.completions.complete(&request).await {
            Ok(answer) => QueryOutcome::Answered(answer),
            Err(e) => {
                log::error!("[Synthesizer] Query {}: completion failed: {}", query_id, e);
                QueryOutcome::ProcessingFailed
            }
        }
    }

    /// Extract, chunk and embed one document.
    async fn process_document(&self, query_id: Uuid, path: &Path) -> (DocumentReport, Vec<Chunk>) {
        let document = Arc::new(Document::new(path));

        let text = match self.extractor.extract(path).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!(
                    "[RAG] Query {}: skipping {}: {}",
                    query_id,
                    document.source_name(),
                    e
                );
                let report = DocumentReport {
                    path: path.to_path_buf(),
                    status: DocumentStatus::Skipped {
                        reason: e.to_string(),
                    },
                };
                return (report, Vec::new());
            }
        };

        let mut chunks = chunk_document(&document, &text, self.chunk_tokens);
        let failed_embeddings = self.embedder.embed_chunks(&mut chunks).await;
        log::info!(
            "[RAG] Query {}: {} -> {} chunk(s), {} failed embedding(s)",
            query_id,
            document.source_name(),
            chunks.len(),
            failed_embeddings
        );

        let report = DocumentReport {
            path: path.to_path_buf(),
            status: DocumentStatus::Used {
                chunks: chunks.len(),
                failed_embeddings,
            },
        };
        (report, chunks)
    }
}
