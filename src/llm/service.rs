use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use super::gemini::GeminiProvider;
use super::openai_compat::OpenAiCompatibleProvider;
use super::provider::{Embedder, Generator};
use crate::core::config::{LlmConfig, ProviderKind};
use crate::rag::PipelineError;

/// Embedding and generation backends resolved from configuration.
#[derive(Clone)]
pub struct LlmBackends {
    pub embedder: Arc<dyn Embedder>,
    pub generator: Arc<dyn Generator>,
}

impl LlmBackends {
    pub fn from_config(config: &LlmConfig) -> Result<Self, PipelineError> {
        let client = build_client(config.request_timeout_secs)?;

        let backends = match config.provider {
            ProviderKind::Gemini => {
                let provider = Arc::new(GeminiProvider::new(&config.gemini, client)?);
                Self {
                    embedder: provider.clone(),
                    generator: provider,
                }
            }
            ProviderKind::OpenaiCompatible => {
                let provider = Arc::new(OpenAiCompatibleProvider::new(
                    &config.openai_compatible,
                    client,
                ));
                Self {
                    embedder: provider.clone(),
                    generator: provider,
                }
            }
        };

        tracing::info!(
            "LLM backends ready (embedder: {}, generator: {})",
            backends.embedder.name(),
            backends.generator.name()
        );
        Ok(backends)
    }
}

fn build_client(timeout_secs: Option<u64>) -> Result<Client, PipelineError> {
    let mut builder = Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder
        .build()
        .map_err(|err| PipelineError::service("http", err))
}
