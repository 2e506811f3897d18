//! External model-service collaborators.
//!
//! The pipeline only sees these traits; `OpenAiClient` is the production
//! implementation and tests substitute scripted providers.

mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use serde::Serialize;

use crate::errors::ProviderError;
use crate::protocol::ChatMessage;

/// Maps text to an embedding vector via a remote service.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, input: &str) -> Result<Vec<f32>, ProviderError>;
}

/// Parameters of one answer-synthesis call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Language-model completion endpoint.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}
