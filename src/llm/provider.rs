use async_trait::async_trait;

use super::types::EmbedMode;
use crate::rag::PipelineError;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// provider name (e.g. "gemini", "openai_compatible")
    fn name(&self) -> &str;

    /// embed a single text; failures surface as `PipelineError::Service`
    async fn embed(&self, text: &str, mode: EmbedMode) -> Result<Vec<f32>, PipelineError>;
}

#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;

    /// single non-streaming completion for `prompt`
    async fn generate(&self, prompt: &str) -> Result<String, PipelineError>;
}
