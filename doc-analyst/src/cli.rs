//! Command-line argument parsing and launch configuration.
//!
//! This module handles CLI argument parsing using clap, applies flag
//! overrides on top of the loaded settings, and dispatches subcommands.

use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::protocol::{DocumentStatus, QueryReport};
use crate::rag::file_processor::TextExtractor;
use crate::rag::ocr::check_ocr_tooling;
use crate::rag::QueryPipeline;
use crate::settings::{
    load_settings, AnalystSettings, ENV_API_KEY, ENV_BASE_URL, ENV_POPPLER_PATH, ENV_TESSDATA_PREFIX,
    ENV_TESSERACT_CMD,
};

/// CLI arguments for doc-analyst
#[derive(Parser, Debug, Clone)]
#[command(name = "doc-analyst", about = "Answer questions about PDF documents")]
pub struct CliArgs {
    /// Settings file (JSON); defaults to config.json in the user config dir
    #[arg(long, value_name = "FILE", env = "DOC_ANALYST_CONFIG", global = true)]
    pub config: Option<PathBuf>,
    /// API key for the OpenAI-compatible service
    #[arg(long, value_name = "KEY", env = ENV_API_KEY, hide_env_values = true, global = true)]
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible service
    #[arg(long, value_name = "URL", env = ENV_BASE_URL, global = true)]
    pub base_url: Option<String>,
    /// Path to the tesseract binary
    #[arg(long, value_name = "PATH", env = ENV_TESSERACT_CMD, global = true)]
    pub tesseract_cmd: Option<PathBuf>,
    /// Tesseract language data directory
    #[arg(long, value_name = "DIR", env = ENV_TESSDATA_PREFIX, global = true)]
    pub tessdata_dir: Option<PathBuf>,
    /// Directory containing poppler's pdftoppm
    #[arg(long, value_name = "DIR", env = ENV_POPPLER_PATH, global = true)]
    pub poppler_path: Option<PathBuf>,
    /// Number of leading pages read from each PDF
    #[arg(long, value_name = "INT", global = true)]
    pub max_pages: Option<u32>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Answer a question from one or more documents
    Ask {
        /// Question text (string or @path/to/file)
        #[arg(long, short, value_name = "TEXT_OR_@FILE")]
        query: String,
        /// Documents to search
        #[arg(value_name = "FILES")]
        files: Vec<PathBuf>,
        /// Also print per-document outcomes and retrieved sources
        #[arg(long)]
        report: bool,
        /// Print the full query report as JSON
        #[arg(long, conflicts_with = "report")]
        json: bool,
    },
    /// Print a document's validated text
    Extract {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Check that the OCR tools can be run
    CheckOcr,
}

/// Read a value from a string or from a file when prefixed with `@`
pub fn read_value_or_file(raw: &str) -> Result<String, String> {
    if let Some(path) = raw.strip_prefix('@') {
        let contents = fs::read_to_string(Path::new(path))
            .map_err(|e| format!("Failed to read {}: {}", path, e))?;
        Ok(contents.trim().to_string())
    } else {
        Ok(raw.to_string())
    }
}

/// Apply flag values on top of file/env settings.
pub fn apply_cli_overrides(args: &CliArgs, settings: &mut AnalystSettings) {
    if let Some(key) = args.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
        settings.api.api_key = Some(key.clone());
    }
    if let Some(url) = &args.base_url {
        settings.api.base_url = url.clone();
    }
    if let Some(cmd) = &args.tesseract_cmd {
        settings.ocr.tesseract_cmd = cmd.clone();
    }
    if let Some(dir) = &args.tessdata_dir {
        settings.ocr.tessdata_dir = Some(dir.clone());
    }
    if let Some(dir) = &args.poppler_path {
        settings.ocr.poppler_bin_dir = Some(dir.clone());
    }
    if let Some(pages) = args.max_pages {
        settings.extraction.max_pages = pages;
    }
}

/// Human-readable summary of a query report.
pub fn format_report(report: &QueryReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Query {} ({:.2?}): {} document(s) used, {} skipped",
        report.query_id,
        report.elapsed,
        report.documents_used(),
        report.documents_skipped()
    );
    for doc in &report.documents {
        let line = match &doc.status {
            DocumentStatus::Used {
                chunks,
                failed_embeddings,
            } => format!("used     {} chunk(s), {} failed embedding(s)", chunks, failed_embeddings),
            DocumentStatus::Skipped { reason } => format!("skipped  {}", reason),
        };
        let _ = writeln!(out, "  {}  {}", doc.path.display(), line);
    }
    if !report.retrieved.is_empty() {
        let _ = writeln!(out, "Retrieved context:");
        for (i, ctx) in report.retrieved.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {}. {} chunk {} ({}) similarity {:.4}",
                i + 1,
                ctx.source,
                ctx.chunk_index,
                if ctx.is_table { "table" } else { "text" },
                ctx.similarity
            );
        }
    }
    out
}

/// Load settings and run the selected subcommand.
pub async fn run(args: CliArgs) -> Result<ExitCode, String> {
    let mut settings = load_settings(args.config.as_deref())?;
    apply_cli_overrides(&args, &mut settings);
    settings.validate()?;

    match args.command {
        CliCommand::Ask {
            query,
            files,
            report,
            json,
        } => {
            let query = read_value_or_file(&query)?;
            let pipeline = QueryPipeline::from_settings(&settings).map_err(|e| e.to_string())?;
            let query_report = pipeline.run_query(&query, &files).await;

            if json {
                let rendered = serde_json::to_string_pretty(&query_report)
                    .map_err(|e| format!("Failed to serialize report: {}", e))?;
                println!("{}", rendered);
            } else {
                println!("{}", query_report.outcome);
                if report {
                    eprint!("\n{}", format_report(&query_report));
                }
            }

            Ok(if query_report.outcome.is_answered() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        CliCommand::Extract { file } => {
            let extractor = TextExtractor::new(settings.extraction.clone(), settings.ocr.clone());
            match extractor.extract(&file).await {
                Ok(text) => {
                    println!("{}", text);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("Skipped {}: {}", file.display(), e);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        CliCommand::CheckOcr => {
            let checks = check_ocr_tooling(&settings.ocr);
            for check in &checks {
                println!(
                    "[{}] {:<10} {}  {}",
                    if check.available { "ok" } else { "missing" },
                    check.tool,
                    check.command.display(),
                    check.detail
                );
            }
            Ok(if checks.iter().all(|c| c.available) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
