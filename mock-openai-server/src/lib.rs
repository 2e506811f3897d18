//! OpenAI-compatible mock server used by doc-analyst tests and local runs.

pub mod server;

pub use server::{
    keyword_embedding, router, run_with_args, spawn_mock_server, CliArgs, MockConfig, MockState,
    DEFAULT_ANSWER, DEFAULT_DIMENSION, DEFAULT_HOST, DEFAULT_PORT,
};
