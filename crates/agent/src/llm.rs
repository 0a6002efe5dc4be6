use async_trait::async_trait;
use thiserror::Error;

use vidsage_core::Message;

/// One chat completion call: a system prompt followed by the caller's history.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, messages: &[Message], temperature: f32) -> Self {
        Self { system: system.into(), messages: messages.to_vec(), temperature }
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("completion request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("completion service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("completion response could not be decoded: {0}")]
    Decode(String),
    #[error("completion response contained no choices")]
    NoChoices,
    #[error("completion client is not configured: {0}")]
    Configuration(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    fn model(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}
