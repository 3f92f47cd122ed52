use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use super::provider::{Embedder, Generator};
use super::types::EmbedMode;
use crate::core::config::GeminiConfig;
use crate::rag::PipelineError;

const SERVICE: &str = "gemini";

/// Google Generative Language API client used for both embeddings and answers.
#[derive(Clone)]
pub struct GeminiProvider {
    base_url: String,
    api_key: String,
    embedding_model: String,
    generation_model: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: &GeminiConfig, client: Client) -> Result<Self, PipelineError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| PipelineError::service(SERVICE, "API key is not configured"))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            embedding_model: qualify_model(&config.embedding_model),
            generation_model: qualify_model(&config.generation_model),
            client,
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/{}:{}", self.base_url, model, method)
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<Response, PipelineError> {
        let res = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| PipelineError::service(SERVICE, err))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::service(
                SERVICE,
                format!("{}: {}", status, error_message(&text)),
            ));
        }
        Ok(res)
    }
}

fn qualify_model(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

fn task_type(mode: EmbedMode) -> &'static str {
    match mode {
        EmbedMode::Query => "RETRIEVAL_QUERY",
        EmbedMode::Document => "RETRIEVAL_DOCUMENT",
    }
}

/// Pull `error.message` out of a Google error payload, falling back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<GoogleErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct GoogleErrorEnvelope {
    error: GoogleError,
}

#[derive(Deserialize)]
struct GoogleError {
    message: String,
}

#[async_trait]
impl Embedder for GeminiProvider {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn embed(&self, text: &str, mode: EmbedMode) -> Result<Vec<f32>, PipelineError> {
        let url = self.endpoint(&self.embedding_model, "embedContent");
        let body = EmbedContentRequest {
            model: &self.embedding_model,
            content: Content {
                role: None,
                parts: vec![Part { text }],
            },
            task_type: task_type(mode),
        };

        let res = self.post(&url, &body).await?;
        let payload: EmbedContentResponse = res
            .json()
            .await
            .map_err(|err| PipelineError::service(SERVICE, err))?;

        if payload.embedding.values.is_empty() {
            return Err(PipelineError::service(SERVICE, "empty embedding returned"));
        }
        Ok(payload.embedding.values)
    }
}

#[async_trait]
impl Generator for GeminiProvider {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn generate(&self, prompt: &str) -> Result<String, PipelineError> {
        let url = self.endpoint(&self.generation_model, "generateContent");
        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: prompt }],
            }],
        };

        let res = self.post(&url, &body).await?;
        let payload: GenerateContentResponse = res
            .json()
            .await
            .map_err(|err| PipelineError::service(SERVICE, err))?;

        let first = payload.candidates.into_iter().next();
        let text = first
            .as_ref()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.is_empty() {
            let reason = payload
                .prompt_feedback
                .and_then(|feedback| feedback.block_reason)
                .or_else(|| first.and_then(|candidate| candidate.finish_reason))
                .unwrap_or_else(|| "no candidates".to_string());
            return Err(PipelineError::service(
                SERVICE,
                format!("response contained no text ({})", reason),
            ));
        }

        Ok(text)
    }
}
