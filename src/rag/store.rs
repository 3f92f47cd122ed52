//! In-memory passage store.
//!
//! The store is owned by the coordinator and mutated only there. Answer
//! workers get a [`PassageSnapshot`], a shared read-only view that stays valid
//! while the coordinator keeps appending.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use super::error::PipelineError;

/// A chunk of document text paired with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Passage {
    pub text: String,
    #[serde(skip_serializing)]
    pub embedding: Vec<f32>,
    /// Document the chunk came from.
    pub source: PathBuf,
    /// Position of the chunk within its source.
    pub chunk_index: usize,
}

impl Passage {
    pub fn new(
        text: impl Into<String>,
        embedding: Vec<f32>,
        source: impl Into<PathBuf>,
        chunk_index: usize,
    ) -> Self {
        Self {
            text: text.into(),
            embedding,
            source: source.into(),
            chunk_index,
        }
    }
}

pub type PassageSnapshot = Arc<Vec<Passage>>;

/// Ordered, append-only table of passages.
#[derive(Debug, Clone, Default)]
pub struct PassageStore {
    passages: PassageSnapshot,
}

impl PassageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Embedding dimensionality shared by every stored passage.
    pub fn dimension(&self) -> Option<usize> {
        self.passages.first().map(|p| p.embedding.len())
    }

    pub fn passages(&self) -> &[Passage] {
        &self.passages
    }

    pub fn snapshot(&self) -> PassageSnapshot {
        Arc::clone(&self.passages)
    }

    /// Append a batch, or nothing at all if any passage in it has a
    /// dimensionality different from the store's.
    pub fn append(&mut self, batch: Vec<Passage>) -> Result<usize, PipelineError> {
        let Some(first) = batch.first() else {
            return Ok(0);
        };
        let expected = self.dimension().unwrap_or(first.embedding.len());
        if let Some(bad) = batch.iter().find(|p| p.embedding.len() != expected) {
            return Err(PipelineError::DimensionMismatch {
                expected,
                actual: bad.embedding.len(),
            });
        }

        let added = batch.len();
        Arc::make_mut(&mut self.passages).extend(batch);
        Ok(added)
    }

    pub fn contains_text(&self, text: &str) -> bool {
        self.passages.iter().any(|p| p.text == text)
    }

    /// Distinct sources in the order they were first ingested.
    pub fn sources(&self) -> Vec<PathBuf> {
        let mut sources: Vec<PathBuf> = Vec::new();
        for passage in self.passages.iter() {
            if !sources.contains(&passage.source) {
                sources.push(passage.source.clone());
            }
        }
        sources
    }

    /// Drop every passage, returning how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.passages.len();
        self.passages = Arc::new(Vec::new());
        removed
    }
}
