//! Integration tests for the question-answering pipeline
//!
//! These tests exercise whole flows rather than single functions:
//! 1. Scripted in-process providers (ranking, skips, failure handling)
//! 2. The OpenAI client against the in-process mock server
//! 3. Extraction from generated PDF fixtures

pub mod pdf_fixture_integration;
pub mod support;
