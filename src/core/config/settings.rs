use serde::{Deserialize, Serialize};

use crate::rag::DEFAULT_CHUNK_SIZE;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_EMBEDDING_MODEL: &str = "models/embedding-001";
pub const DEFAULT_GEMINI_GENERATION_MODEL: &str = "models/gemini-pro";
pub const DEFAULT_OPENAI_COMPAT_BASE_URL: &str = "http://localhost:1234";

/// Typed view of the merged `config.yml` + `secrets.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub rag: RagConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// 0 binds an ephemeral port.
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Chunk length in characters.
    pub chunk_size: usize,
    /// Skip chunks whose text is already stored when a document is ingested again.
    pub deduplicate: bool,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            deduplicate: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Gemini,
    OpenaiCompatible,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    /// Client-side timeout for every embedding/generation call. Unset means
    /// no timeout.
    pub request_timeout_secs: Option<u64>,
    pub gemini: GeminiConfig,
    pub openai_compatible: OpenAiCompatibleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub embedding_model: String,
    pub generation_model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            api_key: None,
            embedding_model: DEFAULT_GEMINI_EMBEDDING_MODEL.to_string(),
            generation_model: DEFAULT_GEMINI_GENERATION_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiCompatibleConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub embedding_model: String,
    pub generation_model: String,
}

impl Default for OpenAiCompatibleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OPENAI_COMPAT_BASE_URL.to_string(),
            api_key: None,
            embedding_model: "text-embedding-nomic-embed-text-v1.5".to_string(),
            generation_model: "local-model".to_string(),
        }
    }
}
