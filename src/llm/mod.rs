pub mod openai;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use std::sync::Arc;

/// Errors that can occur when communicating with the language model.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// An API error occurred
    #[error("API error: {0}")]
    Api(String),
    /// A network error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// The response from the model was invalid
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),
}

/// The language model as an opaque function: prompt and text in, text out.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_text: &str) -> Result<String, LlmError>;
}

/// A builder for creating LLM clients.
#[derive(Debug, Default)]
pub struct LlmClientBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout: Option<std::time::Duration>,
}

impl LlmClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Creates an OpenAI-compatible client.
    pub fn build_openai(self) -> Result<Arc<dyn LlmClient>, LlmError> {
        Ok(Arc::new(OpenAiClient::new(
            self.api_key
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .ok_or_else(|| LlmError::Auth("OpenAI API key not provided".to_string()))?,
            self.base_url,
            self.model,
            self.timeout,
        )?))
    }
}
