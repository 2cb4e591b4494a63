use thiserror::Error;

use crate::config::prompt::PromptError;
use crate::llm::BoxError;

/// Failures raised by the pipeline stages. The agent turns render failures into
/// an `ERROR_HTML` outcome; everything else aborts the chat request.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("LLM request failed: {0}")]
    Llm(#[source] BoxError),
    #[error("LLM stream failed: {0}")]
    Stream(#[source] BoxError),
    #[error("rendered document rejected: {0}")]
    Render(String),
    #[error(transparent)]
    Prompt(#[from] PromptError),
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
