//! OpenAI-compatible HTTP client for embeddings and chat completions.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::{CompletionProvider, CompletionRequest, EmbeddingProvider};
use crate::errors::ProviderError;
use crate::protocol::ChatMessage;
use crate::settings::ApiSettings;

/// Async client for an OpenAI-compatible `/v1` API.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    embedding_model: String,
    completion_model: String,
}

impl OpenAiClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, ProviderError> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ProviderError::MissingApiKey)?;

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|_| ProviderError::InvalidResponse("API key is not a valid header value".into()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(settings.request_timeout())
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            embedding_model: settings.embedding_model.clone(),
            completion_model: settings.completion_model.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Turn a non-success response into the matching `ProviderError`.
    async fn check_status(resp: Response) -> Result<Response, ProviderError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp
            .text()
            .await
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        if status == StatusCode::TOO_MANY_REQUESTS {
            Err(ProviderError::RateLimited {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(ProviderError::Http {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiClient {
    async fn embed(&self, input: &str) -> Result<Vec<f32>, ProviderError> {
        let request = EmbeddingRequest {
            model: &self.embedding_model,
            input: [input],
        };
        let resp = self
            .client
            .post(self.endpoint("embeddings"))
            .json(&request)
            .send()
            .await?;
        let parsed: EmbeddingResponse = Self::check_status(resp).await?.json().await?;

        parsed
            .data
            .into_iter()
            .min_by_key(|entry| entry.index)
            .map(|entry| entry.embedding)
            .ok_or_else(|| ProviderError::InvalidResponse("no embedding in response".into()))
    }
}

#[async_trait]
impl CompletionProvider for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let body = ChatCompletionRequest {
            model: &self.completion_model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };
        let resp = self
            .client
            .post(self.endpoint("chat/completions"))
            .json(&body)
            .send()
            .await?;
        let parsed: ChatCompletionResponse = Self::check_status(resp).await?.json().await?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| ProviderError::InvalidResponse("completion had no content".into()))
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_is_rejected() {
        let settings = ApiSettings::default();
        assert!(matches!(
            OpenAiClient::new(&settings),
            Err(ProviderError::MissingApiKey)
        ));

        let blank = ApiSettings {
            api_key: Some("   ".to_string()),
            ..ApiSettings::default()
        };
        assert!(matches!(
            OpenAiClient::new(&blank),
            Err(ProviderError::MissingApiKey)
        ));
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let settings = ApiSettings {
            api_key: Some("sk-test".to_string()),
            base_url: "http://127.0.0.1:9999/v1/".to_string(),
            ..ApiSettings::default()
        };
        let client = OpenAiClient::new(&settings).unwrap();
        assert_eq!(client.endpoint("embeddings"), "http://127.0.0.1:9999/v1/embeddings");
    }

    #[test]
    fn test_embedding_request_wraps_single_input() {
        let request = EmbeddingRequest {
            model: "text-embedding-3-small",
            input: ["hello"],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["input"][0], "hello");
        assert_eq!(json["model"], "text-embedding-3-small");
    }

    #[test]
    fn test_completion_response_parsing() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"  Jane Doe.  "}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("  Jane Doe.  "));
    }
}
