pub mod gemini;
pub mod openai_compat;
pub mod provider;
pub mod service;
pub mod types;

pub use provider::{Embedder, Generator};
pub use service::LlmBackends;
pub use types::{ChatMessage, EmbedMode};
