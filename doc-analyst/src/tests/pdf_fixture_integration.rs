//! Extraction tests against PDFs generated with lopdf
//!
//! Fixtures are built at test time: text pages use a standard Helvetica font,
//! and "scanned" pages have no text layer at all. OCR tools are pointed at
//! nonexistent paths, so the OCR fallback fails deterministically.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::support::{filler, test_settings, write_file, KeywordEmbeddings, RecordingCompletions};
use crate::errors::ExtractionError;
use crate::protocol::DocumentStatus;
use crate::rag::file_processor::TextExtractor;
use crate::rag::pdf_extractor::{extract_pages_via_lopdf, extract_structured_pages};
use crate::rag::QueryPipeline;

/// Write a PDF with one page per entry; each page shows its lines top-down.
fn write_pdf(path: &Path, pages: &[Vec<String>]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 10.into()]),
            Operation::new("TL", vec![14.into()]),
            Operation::new("Td", vec![40.into(), 800.into()]),
        ];
        for line in lines {
            operations.push(Operation::new("Tj", vec![Object::string_literal(line.as_str())]));
            operations.push(Operation::new("T*", vec![]));
        }
        operations.push(Operation::new("ET", vec![]));

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// Roughly ten words per line, drawn from the shared filler text.
fn text_lines(topic: &str, sentences: usize) -> Vec<String> {
    filler(topic, sentences)
        .split_whitespace()
        .collect::<Vec<_>>()
        .chunks(10)
        .map(|words| words.join(" "))
        .collect()
}

fn extractor() -> TextExtractor {
    let settings = test_settings();
    TextExtractor::new(settings.extraction, settings.ocr)
}

fn fixture(dir: &Path, name: &str, pages: &[Vec<String>]) -> PathBuf {
    let path = dir.join(name);
    write_pdf(&path, pages);
    path
}

#[test]
fn test_structured_pages_respect_max_pages() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fixture(
        dir.path(),
        "report.pdf",
        &[text_lines("finance", 1), text_lines("audit", 1), text_lines("risk", 1)],
    );

    let all = extract_structured_pages(&pdf, 5).unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].number, 1);
    assert!(all[0].text.contains("finance"));
    assert!(all[2].text.contains("risk"));

    let first_two = extract_structured_pages(&pdf, 2).unwrap();
    assert_eq!(first_two.len(), 2);
}

#[test]
fn test_only_leading_pages_reach_text_extraction() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fixture(
        dir.path(),
        "annual.pdf",
        &[text_lines("finance", 1), text_lines("audit", 1), text_lines("risk", 1)],
    );

    let first = extract_structured_pages(&pdf, 1).unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].number, 1);
    assert!(first[0].text.contains("finance"));
    assert!(!first[0].text.contains("audit"));
    assert!(!first[0].text.contains("risk"));

    let fallback = extract_pages_via_lopdf(&pdf, 2).unwrap();
    let numbers: Vec<u32> = fallback.iter().map(|p| p.number).collect();
    assert_eq!(numbers, vec![1, 2]);
    assert!(fallback[1].text.contains("audit"));
    assert!(fallback.iter().all(|p| !p.text.contains("risk")));
}

#[test]
fn test_text_pdf_extracts_with_page_labels() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fixture(dir.path(), "report.pdf", &[text_lines("finance", 4)]);

    let text = extractor().extract_blocking(&pdf).unwrap();

    assert!(text.contains("PAGE 1 TEXT:"));
    assert!(text.contains("warehouse"));
}

#[test]
fn test_pages_beyond_limit_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    // Enough text exists only on page 3, past a two-page limit
    let pdf = fixture(
        dir.path(),
        "late.pdf",
        &[vec!["Cover".to_string()], vec!["Contents".to_string()], text_lines("finance", 4)],
    );
    let mut settings = test_settings();
    settings.extraction.max_pages = 2;
    let extractor = TextExtractor::new(settings.extraction, settings.ocr);

    assert!(matches!(
        extractor.extract_blocking(&pdf),
        Err(ExtractionError::InsufficientContent { .. })
    ));
}

#[test]
fn test_textless_pdf_falls_back_to_ocr() {
    let dir = tempfile::tempdir().unwrap();
    let pdf = fixture(dir.path(), "scan.pdf", &[vec![], vec![]]);

    // OCR was attempted (and failed on the missing tools)
    let err = extractor().extract_blocking(&pdf).unwrap_err();
    assert!(matches!(err, ExtractionError::Ocr(msg) if msg.contains("pdftoppm")));
}

#[tokio::test]
async fn test_pipeline_skips_scanned_pdf_and_uses_text_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let scan = fixture(dir.path(), "scan.pdf", &[vec![]]);
    let report_pdf = fixture(dir.path(), "report.pdf", &[text_lines("finance", 4)]);
    let notes = write_file(dir.path(), "notes.txt", "short");

    let completions = Arc::new(RecordingCompletions::answering("done"));
    let pipeline = QueryPipeline::new(
        &test_settings(),
        Arc::new(KeywordEmbeddings::new()),
        completions.clone(),
    );
    let report = pipeline
        .run_query("How fast is warehouse throughput?", &[scan, report_pdf, notes])
        .await;

    assert!(report.outcome.is_answered());
    assert_eq!(report.documents_used(), 1);
    assert!(matches!(
        &report.documents[0].status,
        DocumentStatus::Skipped { reason } if reason.starts_with("OCR failed")
    ));
    assert!(report.documents[1].is_used());
    assert!(completions.last_user_prompt().contains("(from report.pdf)"));
}
