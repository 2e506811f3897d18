//! doc-analyst: question answering over PDF documents.
//!
//! Text is extracted (with an OCR fallback for scanned pages), chunked,
//! embedded, ranked against the question, and handed to a language model
//! together with a fixed analyst instruction.

pub mod cli;
pub mod errors;
pub mod paths;
pub mod process_utils;
pub mod protocol;
pub mod providers;
pub mod rag;
pub mod retry;
pub mod settings;

#[cfg(test)]
mod tests;

pub use protocol::{QueryOutcome, QueryReport};
pub use rag::QueryPipeline;
pub use settings::{load_settings, AnalystSettings};
