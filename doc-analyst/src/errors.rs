//! Error types for the question-answering pipeline.

use thiserror::Error;

/// Errors from the remote embedding / completion service.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("No API key configured for the model service")]
    MissingApiKey,

    #[error("Rate limited by model service (HTTP {status}): {body}")]
    RateLimited { status: u16, body: String },

    #[error("Model service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Request to model service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected response from model service: {0}")]
    InvalidResponse(String),
}

/// Classifies errors that should be retried with backoff.
pub trait RateLimited {
    fn is_rate_limited(&self) -> bool;
}

impl RateLimited for ProviderError {
    fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. })
    }
}

/// Terminal result of a retried operation.
#[derive(Debug, Error)]
pub enum RetryError<E: std::error::Error + 'static> {
    #[error("Max retries exceeded after {attempts} rate-limited attempts")]
    MaxRetriesExceeded { attempts: u32 },

    #[error(transparent)]
    Operation(E),
}

/// Reasons a document contributes no text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF extraction failed: {0}")]
    Pdf(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    #[error("No text found by structured extraction or OCR")]
    NoText,

    #[error("Only {found} meaningful words found, more than {required} required")]
    InsufficientContent { found: usize, required: usize },

    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// Errors while loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid settings: {0}")]
    Invalid(String),
}

impl From<SettingsError> for String {
    fn from(err: SettingsError) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_rate_limits_are_retryable() {
        let limited = ProviderError::RateLimited {
            status: 429,
            body: "slow down".to_string(),
        };
        let server = ProviderError::Http {
            status: 500,
            body: "boom".to_string(),
        };
        assert!(limited.is_rate_limited());
        assert!(!server.is_rate_limited());
        assert!(!ProviderError::MissingApiKey.is_rate_limited());
    }

    #[test]
    fn test_retry_error_messages() {
        let exhausted: RetryError<ProviderError> = RetryError::MaxRetriesExceeded { attempts: 5 };
        assert!(exhausted.to_string().contains("Max retries exceeded"));

        let wrapped: RetryError<ProviderError> = RetryError::Operation(ProviderError::Http {
            status: 400,
            body: "bad input".to_string(),
        });
        assert_eq!(wrapped.to_string(), "Model service returned HTTP 400: bad input");
    }
}
