//! Retrieval pipeline building blocks.
//!
//! This module provides:
//! - `extractor`: document → plain text
//! - `Chunker`: fixed-size character chunks
//! - `PassageStore`: ordered in-memory (text, embedding) table
//! - `retrieve_best`: top-1 dot-product retrieval
//! - `build_prompt`: grounded instruction for the generator

mod chunker;
mod error;
pub mod extractor;
mod prompt;
mod retriever;
mod store;

pub use chunker::{Chunker, DEFAULT_CHUNK_SIZE};
pub use error::PipelineError;
pub use prompt::{build_prompt, sanitize_passage};
pub use retriever::{dot_product, retrieve_best, RetrievedPassage};
pub use store::{Passage, PassageSnapshot, PassageStore};
