use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};

use super::provider::{Embedder, Generator};
use super::types::{ChatMessage, EmbedMode};
use crate::core::config::OpenAiCompatibleConfig;
use crate::rag::PipelineError;

const SERVICE: &str = "openai_compatible";

/// Client for OpenAI-style servers (LM Studio, llama.cpp server, vLLM, ...).
#[derive(Clone)]
pub struct OpenAiCompatibleProvider {
    base_url: String,
    api_key: Option<String>,
    embedding_model: String,
    generation_model: String,
    client: Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(config: &OpenAiCompatibleConfig, client: Client) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            embedding_model: config.embedding_model.clone(),
            generation_model: config.generation_model.clone(),
            client,
        }
    }

    fn request(&self, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.post(url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send(&self, path: &str, body: Value) -> Result<Value, PipelineError> {
        let res = self
            .request(path)
            .json(&body)
            .send()
            .await
            .map_err(|err| PipelineError::service(SERVICE, err))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(PipelineError::service(
                SERVICE,
                format!("{}: {}", status, text.trim()),
            ));
        }

        res.json().await.map_err(|err| PipelineError::service(SERVICE, err))
    }
}

#[async_trait]
impl Embedder for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        SERVICE
    }

    // The OpenAI embeddings API has no query/document distinction.
    async fn embed(&self, text: &str, _mode: EmbedMode) -> Result<Vec<f32>, PipelineError> {
        let body = json!({
            "model": self.embedding_model,
            "input": [text],
        });
        let payload = self.send("/v1/embeddings", body).await?;

        let vector = match payload["data"][0]["embedding"].as_array() {
            Some(vals) => vals
                .iter()
                .enumerate()
                .map(|(index, v)| {
                    v.as_f64().map(|f| f as f32).ok_or_else(|| {
                        PipelineError::service(
                            SERVICE,
                            format!("embedding value at index {} is not a number", index),
                        )
                    })
                })
                .collect::<Result<Vec<f32>, _>>()?,
            None => Vec::new(),
        };

        if vector.is_empty() {
            return Err(PipelineError::service(SERVICE, "empty embedding returned"));
        }
        Ok(vector)
    }
}

#[async_trait]
impl Generator for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn generate(&self, prompt: &str) -> Result<String, PipelineError> {
        let body = json!({
            "model": self.generation_model,
            "messages": [ChatMessage::user(prompt)],
            "stream": false,
        });
        let payload = self.send("/v1/chat/completions", body).await?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| PipelineError::service(SERVICE, "response contained no message content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn provider(base_url: &str, api_key: Option<&str>) -> OpenAiCompatibleProvider {
        let config = OpenAiCompatibleConfig {
            base_url: format!("{}/", base_url),
            api_key: api_key.map(|k| k.to_string()),
            embedding_model: "embed-model".to_string(),
            generation_model: "chat-model".to_string(),
        };
        OpenAiCompatibleProvider::new(&config, Client::new())
    }

    #[tokio::test]
    async fn embed_reads_first_data_entry() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/embeddings")
            .match_header("authorization", "Bearer sk-local")
            .match_body(Matcher::PartialJson(json!({
                "model": "embed-model",
                "input": ["Grass is green."]
            })))
            .with_status(200)
            .with_body(json!({ "data": [{ "embedding": [0.5, 0.25] }] }).to_string())
            .create_async()
            .await;

        let vector = provider(&server.url(), Some("sk-local"))
            .embed("Grass is green.", EmbedMode::Document)
            .await
            .expect("embedding");
        assert_eq!(vector, vec![0.5, 0.25]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn generate_returns_message_content() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", Matcher::Missing)
            .match_body(Matcher::PartialJson(json!({
                "model": "chat-model",
                "stream": false,
                "messages": [{ "role": "user", "content": "prompt" }]
            })))
            .with_status(200)
            .with_body(
                json!({ "choices": [{ "message": { "role": "assistant", "content": "Blue." } }] })
                    .to_string(),
            )
            .create_async()
            .await;

        let answer = provider(&server.url(), None)
            .generate("prompt")
            .await
            .expect("answer");
        assert_eq!(answer, "Blue.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_is_a_service_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(503)
            .with_body("model is loading")
            .create_async()
            .await;

        let err = provider(&server.url(), None)
            .generate("prompt")
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), "service");
        assert!(err.to_string().contains("model is loading"));
    }

    #[tokio::test]
    async fn missing_embedding_is_a_service_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/embeddings")
            .with_status(200)
            .with_body(json!({ "data": [] }).to_string())
            .create_async()
            .await;

        let err = provider(&server.url(), None)
            .embed("x", EmbedMode::Query)
            .await
            .expect_err("must fail");
        assert!(err.to_string().contains("empty embedding"));
    }

    #[tokio::test]
    async fn non_numeric_embedding_value_is_a_service_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/embeddings")
            .with_status(200)
            .with_body(json!({ "data": [{ "embedding": [0.5, "NaN", 0.25] }] }).to_string())
            .create_async()
            .await;

        let err = provider(&server.url(), None)
            .embed("x", EmbedMode::Document)
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), "service");
        assert!(err.to_string().contains("index 1"));
    }
}
