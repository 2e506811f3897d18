//! OCR fallback for scanned PDFs.
//!
//! Pages are rasterized with poppler's `pdftoppm` into a scratch directory,
//! then each image is recognized with `tesseract`. Both tools come from
//! `OcrSettings`; nothing here reads the environment.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::errors::ExtractionError;
use crate::process_utils::run_ocr_tool;
use crate::settings::OcrSettings;

/// Prefix for rendered page images inside the scratch directory
const PAGE_IMAGE_PREFIX: &str = "page";

/// Result of probing one external OCR tool
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCheck {
    pub tool: &'static str,
    pub command: PathBuf,
    /// First line of the tool's version output, or the failure message
    pub detail: String,
    pub available: bool,
}

/// OCR the first `max_pages` pages of a PDF, joining page text in page order.
pub fn ocr_pdf(pdf: &Path, settings: &OcrSettings, max_pages: u32) -> Result<String, ExtractionError> {
    let scratch = tempfile::Builder::new()
        .prefix("doc-analyst-ocr")
        .tempdir()
        .map_err(|e| ExtractionError::Ocr(format!("failed to create scratch directory: {}", e)))?;

    let images = render_pdf_pages(pdf, scratch.path(), settings, max_pages)?;
    log::info!(
        "[OCR] Rendered {} page(s) of {:?} at {} dpi",
        images.len(),
        pdf.file_name().unwrap_or_default(),
        settings.dpi
    );

    let mut pages = Vec::with_capacity(images.len());
    for image in &images {
        let text = recognize_image(image, settings)?;
        log::debug!("[OCR] {:?}: {} chars", image.file_name().unwrap_or_default(), text.len());
        pages.push(text);
    }

    Ok(pages.join("\n"))
}

/// Rasterize pages `1..=max_pages` to PNG files in `out_dir`, sorted by page.
pub fn render_pdf_pages(
    pdf: &Path,
    out_dir: &Path,
    settings: &OcrSettings,
    max_pages: u32,
) -> Result<Vec<PathBuf>, ExtractionError> {
    let mut cmd = Command::new(settings.pdftoppm_cmd());
    cmd.arg("-r")
        .arg(settings.dpi.to_string())
        .arg("-f")
        .arg("1")
        .arg("-l")
        .arg(max_pages.max(1).to_string())
        .arg("-png")
        .arg(pdf)
        .arg(out_dir.join(PAGE_IMAGE_PREFIX));
    run_ocr_tool(&mut cmd, "pdftoppm")?;

    let entries = std::fs::read_dir(out_dir)
        .map_err(|e| ExtractionError::Ocr(format!("failed to list rendered pages: {}", e)))?;

    let mut images: Vec<(u32, PathBuf)> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter_map(|path| page_number_of_image(&path).map(|n| (n, path)))
        .collect();
    images.sort_by_key(|(n, _)| *n);

    Ok(images.into_iter().map(|(_, path)| path).collect())
}

/// Page number from a pdftoppm output name such as `page-03.png`.
fn page_number_of_image(path: &Path) -> Option<u32> {
    if path.extension()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (prefix, number) = stem.rsplit_once('-')?;
    if prefix != PAGE_IMAGE_PREFIX {
        return None;
    }
    number.parse().ok()
}

/// Recognize one page image, returning tesseract's stdout.
pub fn recognize_image(image: &Path, settings: &OcrSettings) -> Result<String, ExtractionError> {
    let mut cmd = Command::new(&settings.tesseract_cmd);
    cmd.args(tesseract_args(image, settings));

    let output = run_ocr_tool(&mut cmd, "tesseract")?;
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

fn tesseract_args(image: &Path, settings: &OcrSettings) -> Vec<String> {
    let mut args = vec![
        image.to_string_lossy().to_string(),
        "stdout".to_string(),
        "--psm".to_string(),
        settings.page_segmentation_mode.to_string(),
        "--oem".to_string(),
        settings.engine_mode.to_string(),
        "-l".to_string(),
        settings.language.clone(),
    ];
    if let Some(dir) = &settings.tessdata_dir {
        args.push("--tessdata-dir".to_string());
        args.push(dir.to_string_lossy().to_string());
    }
    args
}

/// Probe `tesseract` and `pdftoppm`, reporting which are usable.
pub fn check_ocr_tooling(settings: &OcrSettings) -> Vec<ToolCheck> {
    let mut tesseract = Command::new(&settings.tesseract_cmd);
    tesseract.arg("--version");
    let mut pdftoppm = Command::new(settings.pdftoppm_cmd());
    pdftoppm.arg("-v");

    let mut checks = vec![
        probe_tool("tesseract", settings.tesseract_cmd.clone(), &mut tesseract),
        probe_tool("pdftoppm", settings.pdftoppm_cmd(), &mut pdftoppm),
    ];

    if let Some(dir) = &settings.tessdata_dir {
        let available = dir.is_dir();
        checks.push(ToolCheck {
            tool: "tessdata",
            command: dir.clone(),
            detail: if available {
                "language data directory found".to_string()
            } else {
                "language data directory does not exist".to_string()
            },
            available,
        });
    }

    checks
}

fn probe_tool(tool: &'static str, command: PathBuf, cmd: &mut Command) -> ToolCheck {
    match run_ocr_tool(cmd, tool) {
        Ok(output) => {
            // pdftoppm prints its version on stderr
            let text = if output.stdout.is_empty() {
                String::from_utf8_lossy(&output.stderr).to_string()
            } else {
                String::from_utf8_lossy(&output.stdout).to_string()
            };
            ToolCheck {
                tool,
                command,
                detail: text.lines().next().unwrap_or("").trim().to_string(),
                available: true,
            }
        }
        Err(e) => ToolCheck {
            tool,
            command,
            detail: e.to_string(),
            available: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn missing_tools() -> OcrSettings {
        OcrSettings {
            tesseract_cmd: PathBuf::from("/nonexistent/tesseract"),
            poppler_bin_dir: Some(PathBuf::from("/nonexistent/poppler")),
            tessdata_dir: Some(PathBuf::from("/nonexistent/tessdata")),
            ..OcrSettings::default()
        }
    }

    #[test]
    fn test_page_number_of_image() {
        assert_eq!(page_number_of_image(Path::new("/tmp/x/page-1.png")), Some(1));
        assert_eq!(page_number_of_image(Path::new("/tmp/x/page-012.png")), Some(12));
        assert_eq!(page_number_of_image(Path::new("/tmp/x/page-1.ppm")), None);
        assert_eq!(page_number_of_image(Path::new("/tmp/x/other-1.png")), None);
        assert_eq!(page_number_of_image(Path::new("/tmp/x/page.png")), None);
    }

    #[test]
    fn test_tesseract_args_include_modes_and_tessdata() {
        let settings = OcrSettings {
            tessdata_dir: Some(PathBuf::from("/opt/tessdata")),
            ..OcrSettings::default()
        };
        let args = tesseract_args(Path::new("/tmp/page-1.png"), &settings);
        assert_eq!(
            args,
            vec![
                "/tmp/page-1.png",
                "stdout",
                "--psm",
                "3",
                "--oem",
                "3",
                "-l",
                "eng",
                "--tessdata-dir",
                "/opt/tessdata"
            ]
        );
    }

    #[test]
    fn test_missing_pdftoppm_is_ocr_error() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("scan.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        let err = ocr_pdf(&pdf, &missing_tools(), 5).unwrap_err();
        assert!(matches!(err, ExtractionError::Ocr(msg) if msg.contains("pdftoppm")));
    }

    #[test]
    fn test_check_tooling_reports_missing_tools() {
        let checks = check_ocr_tooling(&missing_tools());
        assert_eq!(checks.len(), 3);
        assert!(checks.iter().all(|c| !c.available));
        assert_eq!(checks[0].tool, "tesseract");
        assert_eq!(checks[1].tool, "pdftoppm");
        assert_eq!(checks[2].tool, "tessdata");
    }
}
