//! OpenAI-compatible mock server for doc-analyst (dev + test edition)
//!
//! - `POST /v1/embeddings` answers deterministic keyword-hash embeddings
//! - `POST /v1/chat/completions` answers a canned grounded reply
//! - Rate limits and failures can be scripted for retry tests

use axum::{
    extract::State as AxumState,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// -----------------------------------------------------------------------------
// Constants
// -----------------------------------------------------------------------------

pub const DEFAULT_HOST: &str = "127.0.0.1";
// Use a less common default port to reduce clashes with local services.
pub const DEFAULT_PORT: u16 = 43031;
pub const DEFAULT_DIMENSION: usize = 1536;
pub const DEFAULT_ANSWER: &str =
    "The documents state that Jane Doe is the Chief Financial Officer (CFO).";

/// Words too common to carry any signal in keyword embeddings
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "in", "is", "it", "of",
    "on", "or", "the", "to", "was", "what", "who", "with",
];

// -----------------------------------------------------------------------------
// CLI
// -----------------------------------------------------------------------------

#[derive(Parser, Debug, Clone)]
#[command(name = "mock-openai-server", about = "OpenAI-compatible mock server")]
pub struct CliArgs {
    /// Host interface to bind
    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,
    /// Port to bind
    #[arg(long, default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// Embedding vector dimension
    #[arg(long, default_value_t = DEFAULT_DIMENSION)]
    pub dimension: usize,
    /// Answer HTTP 429 to the first N embedding requests
    #[arg(long, default_value_t = 0)]
    pub rate_limit_first: usize,
    /// Answer HTTP 500 to embedding inputs containing this text
    #[arg(long)]
    pub fail_needle: Option<String>,
    /// Answer HTTP 500 to every chat completion
    #[arg(long, default_value_t = false)]
    pub fail_completions: bool,
    /// Content of every chat completion
    #[arg(long, default_value = DEFAULT_ANSWER)]
    pub answer: String,
}

// -----------------------------------------------------------------------------
// Configuration & state
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MockConfig {
    pub dimension: usize,
    pub rate_limit_first_n: usize,
    pub fail_needle: Option<String>,
    pub fail_completions: bool,
    pub answer: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            rate_limit_first_n: 0,
            fail_needle: None,
            fail_completions: false,
            answer: DEFAULT_ANSWER.to_string(),
        }
    }
}

impl From<&CliArgs> for MockConfig {
    fn from(args: &CliArgs) -> Self {
        Self {
            dimension: args.dimension,
            rate_limit_first_n: args.rate_limit_first,
            fail_needle: args.fail_needle.clone(),
            fail_completions: args.fail_completions,
            answer: args.answer.clone(),
        }
    }
}

/// Request counters and recorded traffic, shared with tests.
#[derive(Debug)]
pub struct MockState {
    config: MockConfig,
    embedding_requests: AtomicUsize,
    completion_requests: AtomicUsize,
    embedded_inputs: Mutex<Vec<String>>,
    last_completion: Mutex<Option<Value>>,
}

impl MockState {
    pub fn new(config: MockConfig) -> Self {
        Self {
            config,
            embedding_requests: AtomicUsize::new(0),
            completion_requests: AtomicUsize::new(0),
            embedded_inputs: Mutex::new(Vec::new()),
            last_completion: Mutex::new(None),
        }
    }

    /// Embedding requests received, including rate-limited ones
    pub fn embedding_requests(&self) -> usize {
        self.embedding_requests.load(Ordering::SeqCst)
    }

    pub fn completion_requests(&self) -> usize {
        self.completion_requests.load(Ordering::SeqCst)
    }

    /// Every input that was successfully embedded, in arrival order
    pub fn embedded_inputs(&self) -> Vec<String> {
        self.embedded_inputs
            .lock()
            .map(|inputs| inputs.clone())
            .unwrap_or_default()
    }

    /// Body of the most recent chat completion request
    pub fn last_completion(&self) -> Option<Value> {
        self.last_completion.lock().ok().and_then(|last| last.clone())
    }
}

// -----------------------------------------------------------------------------
// Keyword embeddings
// -----------------------------------------------------------------------------

/// Deterministic bag-of-words embedding: each non-stopword token adds 1.0 to
/// the bucket its hash selects. Texts sharing words get positive similarity.
pub fn keyword_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut vector = vec![0.0; dimension];
    if dimension == 0 {
        return vector;
    }
    for word in keyword_tokens(text) {
        let mut hasher = DefaultHasher::new();
        word.hash(&mut hasher);
        let bucket = (hasher.finish() % dimension as u64) as usize;
        vector[bucket] += 1.0;
    }
    vector
}

fn keyword_tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
}

// -----------------------------------------------------------------------------
// HTTP handlers
// -----------------------------------------------------------------------------

type HandlerResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmbeddingInput {
    Single(String),
    Many(Vec<String>),
}

impl EmbeddingInput {
    fn into_vec(self) -> Vec<String> {
        match self {
            EmbeddingInput::Single(s) => vec![s],
            EmbeddingInput::Many(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingsRequest {
    #[serde(default)]
    model: String,
    input: EmbeddingInput,
}

fn error_response(status: StatusCode, message: &str, kind: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({"error": {"message": message, "type": kind}})),
    )
}

pub fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/v1/embeddings", post(embeddings_handler))
        .route("/v1/chat/completions", post(chat_completions_handler))
        .with_state(state)
}

async fn health_handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn embeddings_handler(
    AxumState(state): AxumState<Arc<MockState>>,
    Json(request): Json<EmbeddingsRequest>,
) -> HandlerResult {
    let seen = state.embedding_requests.fetch_add(1, Ordering::SeqCst);
    if seen < state.config.rate_limit_first_n {
        println!("[mock-openai-server] /v1/embeddings -> 429 (request {})", seen + 1);
        return Err(error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "Rate limit reached",
            "rate_limit_exceeded",
        ));
    }

    let inputs = request.input.into_vec();
    if let Some(needle) = &state.config.fail_needle {
        if inputs.iter().any(|input| input.contains(needle.as_str())) {
            println!("[mock-openai-server] /v1/embeddings -> 500 (needle matched)");
            return Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Scripted embedding failure",
                "server_error",
            ));
        }
    }

    let data: Vec<Value> = inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            json!({
                "object": "embedding",
                "index": index,
                "embedding": keyword_embedding(input, state.config.dimension),
            })
        })
        .collect();

    if let Ok(mut recorded) = state.embedded_inputs.lock() {
        recorded.extend(inputs);
    }

    Ok(Json(json!({
        "object": "list",
        "model": request.model,
        "data": data,
        "usage": {"prompt_tokens": 0, "total_tokens": 0},
    })))
}

async fn chat_completions_handler(
    AxumState(state): AxumState<Arc<MockState>>,
    Json(request): Json<Value>,
) -> HandlerResult {
    let count = state.completion_requests.fetch_add(1, Ordering::SeqCst) + 1;
    let model = request.get("model").cloned().unwrap_or(Value::Null);
    if let Ok(mut last) = state.last_completion.lock() {
        *last = Some(request);
    }

    if state.config.fail_completions {
        println!("[mock-openai-server] /v1/chat/completions -> 500 (request {})", count);
        return Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Scripted completion failure",
            "server_error",
        ));
    }

    println!("[mock-openai-server] /v1/chat/completions -> 200 (request {})", count);
    Ok(Json(json!({
        "id": format!("chatcmpl-mock-{}", count),
        "object": "chat.completion",
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": state.config.answer},
            "finish_reason": "stop",
        }],
    })))
}

// -----------------------------------------------------------------------------
// Entry points
// -----------------------------------------------------------------------------

/// Bind an ephemeral localhost port and serve in the background.
pub async fn spawn_mock_server(config: MockConfig) -> std::io::Result<(SocketAddr, Arc<MockState>)> {
    let state = Arc::new(MockState::new(config));
    let listener = tokio::net::TcpListener::bind((DEFAULT_HOST, 0)).await?;
    let addr = listener.local_addr()?;

    let app = router(state.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("[mock-openai-server] server exited: {}", e);
        }
    });

    Ok((addr, state))
}

pub async fn run_with_args(args: CliArgs) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = MockConfig::from(&args);
    println!(
        "[mock-openai-server] starting (host={}, port={}, dimension={}, rate_limit_first={}, fail_completions={})",
        args.host, args.port, config.dimension, config.rate_limit_first_n, config.fail_completions
    );

    let state = Arc::new(MockState::new(config));
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;
    println!(
        "[mock-openai-server] listening on http://{}/v1 (set OPENAI_BASE_URL to this)",
        actual_addr
    );

    axum::serve(listener, router(state)).await?;
    Ok(())
}
