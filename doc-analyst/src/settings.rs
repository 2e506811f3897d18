//! Pipeline settings: defaults, JSON config file, and environment overlay.
//!
//! Precedence (lowest to highest): built-in defaults, the JSON settings file,
//! environment variables, then CLI flags (applied in `cli`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::SettingsError;
use crate::paths::get_default_settings_path;
use crate::protocol::EMBEDDING_DIMENSION;
use crate::retry::RetryPolicy;

// ============ Environment Variable Names ============

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_TESSERACT_CMD: &str = "TESSERACT_CMD";
pub const ENV_TESSDATA_PREFIX: &str = "TESSDATA_PREFIX";
pub const ENV_POPPLER_PATH: &str = "POPPLER_PATH";

// ============ Sections ============

/// Model service connection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiSettings {
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub embedding_model: String,
    pub completion_model: String,
    pub request_timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            completion_model: "gpt-4-turbo".to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl ApiSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Only the first `max_pages` pages are read (structured and OCR).
    pub max_pages: u32,
    /// A document needs strictly more words longer than 3 characters than this.
    pub min_meaningful_words: usize,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            max_pages: 5,
            min_meaningful_words: 50,
        }
    }
}

/// OCR tooling: tesseract for recognition, poppler's pdftoppm for rendering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OcrSettings {
    pub tesseract_cmd: PathBuf,
    pub tessdata_dir: Option<PathBuf>,
    /// Directory holding `pdftoppm`; `None` resolves it from `PATH`.
    pub poppler_bin_dir: Option<PathBuf>,
    pub language: String,
    pub dpi: u32,
    pub page_segmentation_mode: u8,
    pub engine_mode: u8,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            tesseract_cmd: PathBuf::from("tesseract"),
            tessdata_dir: None,
            poppler_bin_dir: None,
            language: "eng".to_string(),
            dpi: 300,
            page_segmentation_mode: 3,
            engine_mode: 3,
        }
    }
}

impl OcrSettings {
    /// Full command used to rasterize PDF pages.
    pub fn pdftoppm_cmd(&self) -> PathBuf {
        let exe = format!("pdftoppm{}", std::env::consts::EXE_SUFFIX);
        match &self.poppler_bin_dir {
            Some(dir) => dir.join(exe),
            None => PathBuf::from(exe),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingSettings {
    pub max_tokens: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self { max_tokens: 1000 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub dimension: usize,
    /// Hard cap on characters sent to the embedding service.
    pub max_input_chars: usize,
    /// Chunk embeddings in flight at once (1 = sequential).
    pub concurrency: usize,
    pub max_retries: u32,
    pub initial_delay_ms: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            dimension: EMBEDDING_DIMENSION,
            max_input_chars: 8000,
            concurrency: 4,
            max_retries: 5,
            initial_delay_ms: 1000,
        }
    }
}

impl EmbeddingSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.initial_delay_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesisSettings {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            temperature: 0.2,
            max_tokens: 500,
        }
    }
}

// ============ Root Settings ============

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalystSettings {
    pub api: ApiSettings,
    pub extraction: ExtractionSettings,
    pub ocr: OcrSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub synthesis: SynthesisSettings,
}

impl AnalystSettings {
    /// Parse settings from a JSON string; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Overlay values found through `lookup` (normally the process environment).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(ENV_API_KEY) {
            self.api.api_key = Some(key);
        }
        if let Some(url) = non_empty(ENV_BASE_URL) {
            self.api.base_url = url;
        }
        if let Some(cmd) = non_empty(ENV_TESSERACT_CMD) {
            self.ocr.tesseract_cmd = PathBuf::from(cmd);
        }
        if let Some(dir) = non_empty(ENV_TESSDATA_PREFIX) {
            self.ocr.tessdata_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = non_empty(ENV_POPPLER_PATH) {
            self.ocr.poppler_bin_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.extraction.max_pages == 0 {
            return Err(SettingsError::Invalid("extraction.max_pages must be at least 1".into()));
        }
        if self.chunking.max_tokens == 0 {
            return Err(SettingsError::Invalid("chunking.max_tokens must be at least 1".into()));
        }
        if self.embedding.dimension == 0 {
            return Err(SettingsError::Invalid("embedding.dimension must be at least 1".into()));
        }
        if self.embedding.max_input_chars == 0 {
            return Err(SettingsError::Invalid(
                "embedding.max_input_chars must be at least 1".into(),
            ));
        }
        if self.embedding.concurrency == 0 {
            return Err(SettingsError::Invalid("embedding.concurrency must be at least 1".into()));
        }
        if self.embedding.max_retries == 0 {
            return Err(SettingsError::Invalid("embedding.max_retries must be at least 1".into()));
        }
        if !self.synthesis.temperature.is_finite() || self.synthesis.temperature < 0.0 {
            return Err(SettingsError::Invalid(format!(
                "synthesis.temperature must be a non-negative number, got {}",
                self.synthesis.temperature
            )));
        }
        Ok(())
    }
}

/// Load settings from `path`, or from the default location when it exists.
///
/// An explicit path that cannot be read is an error; a missing default file
/// simply yields the defaults.
pub fn load_settings(path: Option<&Path>) -> Result<AnalystSettings, SettingsError> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (get_default_settings_path(), false),
    };

    let mut settings = match std::fs::read_to_string(&path) {
        Ok(contents) => {
            log::info!("[Settings] Loaded {}", path.display());
            AnalystSettings::from_json(&contents)?
        }
        Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("[Settings] No settings file at {}, using defaults", path.display());
            AnalystSettings::default()
        }
        Err(e) => {
            return Err(SettingsError::Io {
                path: path.display().to_string(),
                source: e,
            })
        }
    };

    settings.apply_env_overrides(|key| std::env::var(key).ok());
    Ok(settings)
}
