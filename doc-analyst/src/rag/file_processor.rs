//! Document text extraction with OCR fallback and content validation.
//!
//! Structured PDF extraction runs first. OCR only runs when that yields no
//! text at all; an extraction error skips the document outright.

use std::path::Path;

use crate::errors::ExtractionError;
use crate::rag::ocr::ocr_pdf;
use crate::rag::pdf_extractor::{extract_structured_pages, render_structured_text};
use crate::settings::{ExtractionSettings, OcrSettings};

/// Minimum length (exclusive) of a token counted as a meaningful word
const MEANINGFUL_WORD_MIN_CHARS: usize = 3;

/// Extracts validated text from documents on disk.
#[derive(Debug, Clone)]
pub struct TextExtractor {
    extraction: ExtractionSettings,
    ocr: OcrSettings,
}

impl TextExtractor {
    pub fn new(extraction: ExtractionSettings, ocr: OcrSettings) -> Self {
        Self { extraction, ocr }
    }

    /// Extract on the blocking pool; PDF parsing and OCR are CPU/process bound.
    pub async fn extract(&self, path: &Path) -> Result<String, ExtractionError> {
        let extractor = self.clone();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || extractor.extract_blocking(&path))
            .await
            .map_err(|e| ExtractionError::Task(e.to_string()))?
    }

    /// Extract and validate one document's text.
    pub fn extract_blocking(&self, path: &Path) -> Result<String, ExtractionError> {
        let text = if is_pdf(path) {
            self.extract_pdf(path)?
        } else {
            std::fs::read_to_string(path).map_err(|source| ExtractionError::Io {
                path: path.display().to_string(),
                source,
            })?
        };

        validate_extracted_content(&text, self.extraction.min_meaningful_words)?;
        Ok(text)
    }

    fn extract_pdf(&self, path: &Path) -> Result<String, ExtractionError> {
        let max_pages = self.extraction.max_pages;
        let pages = extract_structured_pages(path, max_pages)?;
        let text = render_structured_text(&pages);
        if !text.trim().is_empty() {
            log::info!(
                "[RAG] Structured extraction of {:?}: {} page(s), {} chars",
                path.file_name().unwrap_or_default(),
                pages.len(),
                text.len()
            );
            return Ok(text);
        }

        log::info!(
            "[RAG] No text layer in {:?}, falling back to OCR",
            path.file_name().unwrap_or_default()
        );
        let text = ocr_pdf(path, &self.ocr, max_pages)?;
        if text.trim().is_empty() {
            return Err(ExtractionError::NoText);
        }
        Ok(text)
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Count whitespace tokens longer than three characters.
pub fn count_meaningful_words(text: &str) -> usize {
    text.split_whitespace()
        .filter(|token| token.chars().count() > MEANINGFUL_WORD_MIN_CHARS)
        .count()
}

/// Accept text only with strictly more than `min_words` meaningful words.
pub fn validate_extracted_content(text: &str, min_words: usize) -> Result<(), ExtractionError> {
    let found = count_meaningful_words(text);
    if found > min_words {
        Ok(())
    } else {
        Err(ExtractionError::InsufficientContent {
            found,
            required: min_words,
        })
    }
}
