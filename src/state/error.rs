use thiserror::Error;

use crate::core::errors::ConfigError;
use crate::rag::PipelineError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to initialize LLM backends: {0}")]
    Llm(#[source] PipelineError),

    #[error("Invalid RAG settings: {0}")]
    Rag(#[source] PipelineError),
}
