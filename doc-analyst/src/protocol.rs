//! Shared data types for the question-answering pipeline.
//!
//! Everything here is scoped to a single query invocation: documents,
//! chunks and scores are rebuilt from scratch on every call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

// ============ Pipeline Constants ============

/// Separator placed in extracted text before detected table content.
pub const TABLE_MARKER: &str = "=== TABLE ===";

/// Dimension of every successful embedding vector.
pub const EMBEDDING_DIMENSION: usize = 1536;

/// Number of chunks handed to the answer synthesizer.
pub const TOP_K: usize = 5;

// ============ Caller-visible Error Strings ============

pub const ERROR_NO_DOCUMENTS: &str = "Error: No documents provided";
pub const ERROR_NO_ANALYZABLE_CONTENT: &str = "Error: No analyzable content found in documents";
pub const ERROR_PROCESSING_REQUEST: &str = "Error processing request";

// ============ Documents & Chunks ============

/// A document supplied by the caller, identified by its path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Document {
    pub path: PathBuf,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Display name used in context labels (the file's basename).
    pub fn source_name(&self) -> String {
        source_name_for_path(&self.path)
    }
}

/// Basename of a path, falling back to the full path when there is none.
pub fn source_name_for_path(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Result of embedding one piece of text.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddingOutcome {
    /// A vector of the configured dimension (all zeros for empty input).
    Vector(Vec<f32>),
    /// The embedding service could not produce a vector.
    Failed { reason: String },
}

impl EmbeddingOutcome {
    pub fn vector(&self) -> Option<&[f32]> {
        match self {
            EmbeddingOutcome::Vector(v) => Some(v),
            EmbeddingOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, EmbeddingOutcome::Failed { .. })
    }
}

/// A bounded-size text segment from one document.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub text: String,
    pub document: Arc<Document>,
    /// Position of this chunk within its document.
    pub index: usize,
    /// Absent until the embedder has run.
    pub embedding: Option<EmbeddingOutcome>,
}

impl Chunk {
    pub fn new(text: String, document: Arc<Document>, index: usize) -> Self {
        Self {
            text,
            document,
            index,
            embedding: None,
        }
    }

    pub fn contains_table(&self) -> bool {
        self.text.contains(TABLE_MARKER)
    }
}

/// A chunk paired with its similarity to the query.
#[derive(Debug, Clone, Copy)]
pub struct ScoredChunk<'a> {
    pub chunk: &'a Chunk,
    pub similarity: f32,
}

// ============ Chat Messages ============

/// OpenAI-style chat message sent to the answer synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

// ============ Query Reporting ============

/// How a single document fared in the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    Used {
        chunks: usize,
        failed_embeddings: usize,
    },
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentReport {
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: DocumentStatus,
}

impl DocumentReport {
    pub fn is_used(&self) -> bool {
        matches!(self.status, DocumentStatus::Used { .. })
    }
}

/// One retrieved chunk as it was handed to the synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedContext {
    pub source: String,
    pub chunk_index: usize,
    pub similarity: f32,
    pub is_table: bool,
}

/// Terminal state of a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "answer", rename_all = "snake_case")]
pub enum QueryOutcome {
    Answered(String),
    NoDocuments,
    NoAnalyzableContent,
    ProcessingFailed,
}

impl QueryOutcome {
    pub fn is_answered(&self) -> bool {
        matches!(self, QueryOutcome::Answered(_))
    }

    /// Short status for log lines; never includes the answer text.
    pub fn summary(&self) -> &'static str {
        match self {
            QueryOutcome::Answered(_) => "answered",
            QueryOutcome::NoDocuments => ERROR_NO_DOCUMENTS,
            QueryOutcome::NoAnalyzableContent => ERROR_NO_ANALYZABLE_CONTENT,
            QueryOutcome::ProcessingFailed => ERROR_PROCESSING_REQUEST,
        }
    }

    /// The plain string returned to external callers.
    pub fn into_response_text(self) -> String {
        match self {
            QueryOutcome::Answered(answer) => answer,
            other => other.to_string(),
        }
    }
}

impl fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOutcome::Answered(answer) => f.write_str(answer),
            QueryOutcome::NoDocuments => f.write_str(ERROR_NO_DOCUMENTS),
            QueryOutcome::NoAnalyzableContent => f.write_str(ERROR_NO_ANALYZABLE_CONTENT),
            QueryOutcome::ProcessingFailed => f.write_str(ERROR_PROCESSING_REQUEST),
        }
    }
}

/// Everything the pipeline learned while answering one query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub query_id: Uuid,
    pub outcome: QueryOutcome,
    pub documents: Vec<DocumentReport>,
    pub retrieved: Vec<RetrievedContext>,
    pub elapsed: Duration,
}

impl QueryReport {
    pub fn documents_used(&self) -> usize {
        self.documents.iter().filter(|d| d.is_used()).count()
    }

    pub fn documents_skipped(&self) -> usize {
        self.documents.len() - self.documents_used()
    }
}
