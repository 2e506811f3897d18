//! Structured (non-OCR) PDF text extraction.
//!
//! This module handles:
//! - Per-page text extraction with pdf-extract, falling back to lopdf
//! - Normalizing page text (control characters, trailing blanks)
//! - Detecting tables in the page layout and emitting them after the table marker

use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

use crate::errors::ExtractionError;
use crate::protocol::TABLE_MARKER;

/// Minimum cells per line for the line to count as a table row
const MIN_TABLE_COLUMNS: usize = 2;

/// Minimum consecutive rows for a block to count as a table
const MIN_TABLE_ROWS: usize = 2;

lazy_static! {
    /// Column gaps in layout text: tabs or runs of two or more spaces
    static ref CELL_SEPARATOR: Regex = Regex::new(r"\t+| {2,}").expect("valid cell separator regex");
}

/// Text of one PDF page (1-based page number)
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

/// A table detected in a page's layout text
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedTable {
    pub rows: Vec<Vec<String>>,
}

impl DetectedTable {
    /// Render rows as ` | `-separated cells, one row per line
    pub fn render(&self) -> String {
        self.rows
            .iter()
            .map(|row| row.join(" | "))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Extract the text of the first `max_pages` pages.
///
/// The file is loaded once and cut down to its leading pages before any text
/// is extracted. pdf-extract has better font encoding handling; lopdf is more
/// tolerant of malformed files. pdf-extract can panic on unusual fonts, so it
/// runs under `catch_unwind`.
pub fn extract_structured_pages(path: &Path, max_pages: u32) -> Result<Vec<PageText>, ExtractionError> {
    let mut doc = load_leading_pages(path, max_pages)?;

    let mut buffer = Vec::new();
    let failure = match doc.save_to(&mut buffer) {
        Err(e) => format!("could not serialize leading pages: {}", e),
        Ok(()) => {
            let pages_result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                pdf_extract::extract_text_from_mem_by_pages(&buffer)
            }));
            match pages_result {
                Ok(Ok(pages)) => {
                    return Ok(pages
                        .into_iter()
                        .enumerate()
                        .map(|(i, text)| PageText {
                            number: i as u32 + 1,
                            text,
                        })
                        .collect());
                }
                Ok(Err(e)) => e.to_string(),
                Err(panic_payload) => {
                    if let Some(s) = panic_payload.downcast_ref::<&str>() {
                        s.to_string()
                    } else if let Some(s) = panic_payload.downcast_ref::<String>() {
                        s.clone()
                    } else {
                        "Unknown panic".to_string()
                    }
                }
            }
        }
    };

    log::warn!(
        "[RAG] pdf-extract failed for {:?}, trying lopdf fallback: {}",
        path.file_name().unwrap_or_default(),
        failure
    );
    let pages = extract_document_pages(&doc);
    log::info!("[RAG] lopdf fallback succeeded, extracted {} page(s)", pages.len());
    Ok(pages)
}

/// Fallback page extraction using lopdf.
pub fn extract_pages_via_lopdf(path: &Path, max_pages: u32) -> Result<Vec<PageText>, ExtractionError> {
    let doc = load_leading_pages(path, max_pages)?;
    Ok(extract_document_pages(&doc))
}

/// Load a PDF and drop every page after `max_pages`.
fn load_leading_pages(path: &Path, max_pages: u32) -> Result<lopdf::Document, ExtractionError> {
    let mut doc = lopdf::Document::load(path)
        .map_err(|e| ExtractionError::Pdf(format!("Failed to load PDF: {}", e)))?;

    let total = doc.get_pages().len() as u32;
    if total > max_pages {
        let trailing: Vec<u32> = (max_pages + 1..=total).collect();
        doc.delete_pages(&trailing);
        log::debug!(
            "[RAG] Keeping {} of {} page(s) from {:?}",
            max_pages,
            total,
            path.file_name().unwrap_or_default()
        );
    }
    Ok(doc)
}

fn extract_document_pages(doc: &lopdf::Document) -> Vec<PageText> {
    // get_pages is keyed by page number, already in order
    doc.get_pages()
        .keys()
        .copied()
        .map(|number| {
            let text = match doc.extract_text(&[number]) {
                Ok(text) => text,
                Err(e) => {
                    log::debug!("[RAG] lopdf could not extract page {}: {}", number, e);
                    String::new()
                }
            };
            PageText { number, text }
        })
        .collect()
}

/// Clean raw page text while keeping line structure and column gaps.
pub fn normalize_page_text(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut blank_run = 0;

    for line in raw.lines() {
        let cleaned: String = line
            .chars()
            .filter_map(|c| match c {
                '\u{00A0}' => Some(' '),
                '\t' => Some('\t'),
                c if c.is_control() => None,
                c => Some(c),
            })
            .collect();
        let cleaned = cleaned.trim_end().to_string();

        if cleaned.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 || lines.is_empty() {
                continue;
            }
            lines.push(String::new());
        } else {
            blank_run = 0;
            lines.push(cleaned);
        }
    }

    while lines.last().map_or(false, |l| l.is_empty()) {
        lines.pop();
    }

    lines.join("\n")
}

/// Split one layout line into table cells.
pub fn split_table_cells(line: &str) -> Vec<String> {
    CELL_SEPARATOR
        .split(line.trim())
        .map(str::trim)
        .filter(|cell| !cell.is_empty())
        .map(str::to_string)
        .collect()
}

/// Find tables: runs of consecutive lines that each split into several cells.
pub fn detect_tables(page_text: &str) -> Vec<DetectedTable> {
    let mut tables = Vec::new();
    let mut current: Vec<Vec<String>> = Vec::new();

    for line in page_text.lines() {
        let cells = split_table_cells(line);
        if cells.len() >= MIN_TABLE_COLUMNS {
            current.push(cells);
        } else {
            flush_table(&mut current, &mut tables);
        }
    }
    flush_table(&mut current, &mut tables);

    tables
}

fn flush_table(current: &mut Vec<Vec<String>>, tables: &mut Vec<DetectedTable>) {
    if current.len() >= MIN_TABLE_ROWS {
        tables.push(DetectedTable {
            rows: std::mem::take(current),
        });
    } else {
        current.clear();
    }
}

/// Assemble pages into the document's extracted text.
///
/// Each page with text becomes `PAGE n TEXT:` plus its text; detected tables
/// follow as `=== TABLE ===` blocks so consumers can tell prose from tables.
pub fn render_structured_text(pages: &[PageText]) -> String {
    let mut text = String::new();

    for page in pages {
        let page_text = normalize_page_text(&page.text);
        if page_text.trim().is_empty() {
            continue;
        }
        text.push_str(&format!("\nPAGE {} TEXT:\n{}", page.number, page_text));
        log::debug!("[RAG] Extracted text from page {}", page.number);

        let tables = detect_tables(&page_text);
        if tables.is_empty() {
            continue;
        }
        log::info!("[RAG] Found {} table(s) on page {}", tables.len(), page.number);
        text.push_str(&format!(
            "\nPAGE {} TABLES: {} table(s) found",
            page.number,
            tables.len()
        ));
        for (i, table) in tables.iter().enumerate() {
            text.push_str(&format!(
                "\n{}\nTable {} (page {}):\n{}",
                TABLE_MARKER,
                i + 1,
                page.number,
                table.render()
            ));
        }
    }

    text
}
