//! Shared fixtures for integration tests.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::errors::ProviderError;
use crate::providers::{CompletionProvider, CompletionRequest, EmbeddingProvider};
use crate::settings::{AnalystSettings, OcrSettings};

/// Wide enough that distinct keywords rarely share a hash bucket
pub const TEST_DIMENSION: usize = mock_openai_server::DEFAULT_DIMENSION;

/// Keyword-hash embeddings (same scheme as the mock server) with optional
/// failure for inputs containing `fail_needle`.
pub struct KeywordEmbeddings {
    pub dimension: usize,
    pub fail_needle: Option<&'static str>,
    pub calls: AtomicUsize,
}

impl KeywordEmbeddings {
    pub fn new() -> Self {
        Self {
            dimension: TEST_DIMENSION,
            fail_needle: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(needle: &'static str) -> Self {
        Self {
            fail_needle: Some(needle),
            ..Self::new()
        }
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbeddings {
    async fn embed(&self, input: &str) -> Result<Vec<f32>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(needle) = self.fail_needle {
            if input.contains(needle) {
                return Err(ProviderError::Http {
                    status: 500,
                    body: "scripted failure".into(),
                });
            }
        }
        Ok(mock_openai_server::keyword_embedding(input, self.dimension))
    }
}

/// Records every completion request and answers with a fixed reply.
pub struct RecordingCompletions {
    pub answer: Result<String, ()>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl RecordingCompletions {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Ok(answer.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            answer: Err(()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_user_prompt(&self) -> String {
        let requests = self.requests.lock().unwrap();
        let last = requests.last().expect("no completion request recorded");
        last.messages[1].content.clone()
    }
}

#[async_trait]
impl CompletionProvider for RecordingCompletions {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        self.answer.clone().map_err(|_| ProviderError::Http {
            status: 503,
            body: "scripted completion failure".into(),
        })
    }
}

/// Settings for tests: small chunks, unreachable OCR tools, fast retries.
pub fn test_settings() -> AnalystSettings {
    let mut settings = AnalystSettings::default();
    settings.chunking.max_tokens = 40;
    settings.embedding.dimension = TEST_DIMENSION;
    settings.embedding.initial_delay_ms = 10;
    settings.ocr = OcrSettings {
        tesseract_cmd: PathBuf::from("/nonexistent/tesseract"),
        poppler_bin_dir: Some(PathBuf::from("/nonexistent/poppler")),
        ..OcrSettings::default()
    };
    settings
}

/// Distinct filler words, none of which relate to leadership.
pub fn filler(topic: &str, sentences: usize) -> String {
    (0..sentences)
        .map(|i| {
            format!(
                "Section {} covers {} logistics including warehouse throughput, regional shipping \
                 schedules, inventory turnover, packaging materials and supplier delivery windows.",
                i + 1,
                topic
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}
