pub mod core;
pub mod llm;
pub mod orchestrator;
pub mod rag;
pub mod server;
pub mod state;
