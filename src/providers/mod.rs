use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

mod openai;
mod retry;

pub use openai::OpenAI;

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("OPENAI_API_KEY is not configured")]
    MissingApiKey,
    #[error("request to the model API failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("model API error ({status}): {message}")]
    Status { status: u16, message: String },
    #[error("malformed model API response: {0}")]
    Envelope(String),
}

pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, GatewayError>> + Send + 'a>>;

/// A chat-completion backend. Replies are untrusted text; nothing about
/// their shape is guaranteed.
pub trait ChatModel: Send + Sync {
    fn complete(&self, request: CompletionRequest) -> CompletionFuture<'_>;
}

pub fn resolve_key() -> Option<String> {
    std::env::var("OPENAI_API_KEY")
        .ok()
        .filter(|value| !value.trim().is_empty())
}
