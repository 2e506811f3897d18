//! Retrieval-augmented question answering over PDF documents.

pub mod context_builder;
pub mod document_chunker;
pub mod embedder;
pub mod file_processor;
pub mod ocr;
pub mod pdf_extractor;
pub mod pipeline;
pub mod retrieval;

pub use pipeline::QueryPipeline;
