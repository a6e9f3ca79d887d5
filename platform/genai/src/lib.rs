//! Generative model access for OptiTalent.
//!
//! All model traffic goes through a [`ModelClient`]. Feature code never sends
//! raw prompts; it runs a typed [`Flow`] via [`run_flow`], which either returns
//! validated output or a [`GenAiError`].

use async_trait::async_trait;
use thiserror::Error;

pub mod client;
pub mod flow;
pub mod flows;
pub mod media;

pub use client::{CannedClient, DisabledClient, GeminiClient, GenAiSettings, build_client};
pub use flow::{Flow, Validate, run_flow, strip_json_fences};
pub use media::InlineImage;

#[derive(Debug, Error)]
pub enum GenAiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model api error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("model returned empty content")]
    EmptyContent,

    #[error("model reply is not valid json: {0}")]
    InvalidReply(#[from] serde_json::Error),

    #[error("model reply failed validation: {0}")]
    Schema(String),

    #[error("invalid flow input: {0}")]
    InvalidInput(String),

    #[error("generative model is not configured")]
    Disabled,
}

pub type GenAiResult<T> = Result<T, GenAiError>;

/// One piece of a user turn sent to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Image(InlineImage),
}

impl Part {
    pub fn text(value: impl Into<String>) -> Self {
        Part::Text(value.into())
    }
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Flow name, used for logging and by [`CannedClient`] to pick a reply.
    pub flow: &'static str,
    pub system: String,
    pub parts: Vec<Part>,
    pub temperature: f32,
}

/// A hosted model that turns a prompt into a JSON text reply.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, request: GenerateRequest) -> GenAiResult<String>;

    fn model_name(&self) -> &str;
}
