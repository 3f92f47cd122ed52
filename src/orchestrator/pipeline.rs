//! The two request flows, free of any channel or task plumbing.
//!
//! - `embed_document`: extract → chunk → embed every chunk
//! - `answer_query`: embed query → retrieve best passage → prompt → generate

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::llm::{EmbedMode, Embedder, Generator};
use crate::rag::{build_prompt, extractor, retrieve_best, Chunker, Passage, PipelineError};

/// Outcome of a completed ingestion.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub source: PathBuf,
    /// Chunks produced from the document.
    pub chunks: usize,
    /// Passages appended to the store.
    pub added: usize,
    /// Chunks dropped because their text was already stored.
    pub skipped: usize,
    pub total_passages: usize,
}

/// Outcome of a completed query.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub query: String,
    pub answer: String,
    /// Passage the answer was grounded on.
    pub passage: String,
    pub source: PathBuf,
    pub score: f32,
}

impl Answer {
    /// Chat transcript entry shown to the user.
    pub fn formatted(&self) -> String {
        format!("You: {}\n\nAnswer: {}", self.query, self.answer)
    }
}

/// Turn a document into embedded passages. Any failure discards the whole batch.
pub async fn embed_document(
    embedder: &dyn Embedder,
    chunker: Chunker,
    path: &Path,
) -> Result<Vec<Passage>, PipelineError> {
    let text = extractor::extract_text(path).await?;
    let chunks = chunker.split(&text);
    if chunks.is_empty() {
        tracing::warn!("No text extracted from {}", path.display());
    }
    tracing::info!(
        "Embedding {} chunks from {} (chunk_size={})",
        chunks.len(),
        path.display(),
        chunker.chunk_size()
    );

    let mut passages = Vec::with_capacity(chunks.len());
    for (chunk_index, chunk) in chunks.into_iter().enumerate() {
        let embedding = embedder
            .embed(chunk, EmbedMode::Document)
            .await
            .map_err(|err| {
                tracing::warn!(
                    "Embedding failed at chunk {} of {}: {}",
                    chunk_index,
                    path.display(),
                    err
                );
                err
            })?;
        passages.push(Passage::new(chunk, embedding, path, chunk_index));
    }

    Ok(passages)
}

/// Answer `query` from the best-matching passage in `passages`.
pub async fn answer_query(
    embedder: &dyn Embedder,
    generator: &dyn Generator,
    passages: &[Passage],
    query: &str,
) -> Result<Answer, PipelineError> {
    if query.trim().is_empty() {
        return Err(PipelineError::InvalidInput("query must not be empty".to_string()));
    }
    if passages.is_empty() {
        return Err(PipelineError::EmptyStore);
    }

    let query_embedding = embedder.embed(query, EmbedMode::Query).await?;
    let best = retrieve_best(passages, &query_embedding)?;
    tracing::debug!(
        "Retrieved passage #{} from {} (score {:.4})",
        best.index,
        best.passage.source.display(),
        best.score
    );

    let prompt = build_prompt(query, &best.passage.text);
    let answer = generator.generate(&prompt).await?;

    Ok(Answer {
        query: query.to_string(),
        answer,
        passage: best.passage.text.clone(),
        source: best.passage.source.clone(),
        score: best.score,
    })
}


#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::testing::{EchoGenerator, FixedEmbedder};
    use super::*;

    fn sky_embedder() -> FixedEmbedder {
        FixedEmbedder::new(
            &[
                ("The sky is blue.", vec![1.0, 0.0]),
                ("Grass is green.", vec![0.0, 1.0]),
                ("What color is the sky?", vec![0.9, 0.1]),
            ],
            vec![0.0, 0.0],
        )
    }

    fn text_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".txt")
            .tempfile()
            .expect("tempfile");
        write!(file, "{}", contents).expect("write");
        file
    }

    #[tokio::test]
    async fn embeds_every_chunk_in_document_mode() {
        let file = text_file("The sky is blue.Grass is green.");
        let embedder = sky_embedder();

        let passages = embed_document(&embedder, Chunker::new(16).expect("size"), file.path())
            .await
            .expect("ingest");

        let texts: Vec<&str> = passages.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["The sky is blue.", "Grass is green."]);
        assert_eq!(passages[1].embedding, vec![0.0, 1.0]);
        assert_eq!(passages[1].chunk_index, 1);
        let calls = embedder.calls.lock().expect("calls");
        assert!(calls.iter().all(|(_, mode)| *mode == EmbedMode::Document));
    }

    #[tokio::test]
    async fn failure_midway_discards_the_batch() {
        let file = text_file("The sky is blue.Grass is green.");
        let embedder = sky_embedder().failing_on("Grass is green.");

        let err = embed_document(&embedder, Chunker::new(16).expect("size"), file.path())
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), "service");
    }

    #[tokio::test]
    async fn answers_from_best_passage() {
        let embedder = sky_embedder();
        let generator = EchoGenerator::new();
        let passages = vec![
            Passage::new("The sky is blue.", vec![1.0, 0.0], "a.txt", 0),
            Passage::new("Grass is green.", vec![0.0, 1.0], "a.txt", 1),
        ];

        let answer = answer_query(&embedder, &generator, &passages, "What color is the sky?")
            .await
            .expect("answer");

        assert_eq!(answer.passage, "The sky is blue.");
        assert_eq!(answer.answer, "Based on the document: The sky is blue.");
        assert!(answer.formatted().starts_with("You: What color is the sky?"));
        assert!(answer.formatted().contains("Answer: Based on the document"));

        let calls = embedder.calls.lock().expect("calls");
        assert_eq!(calls.as_slice(), &[("What color is the sky?".to_string(), EmbedMode::Query)]);
    }

    #[tokio::test]
    async fn empty_store_fails_before_calling_services() {
        let embedder = sky_embedder();
        let generator = EchoGenerator::new();

        let err = answer_query(&embedder, &generator, &[], "anything?")
            .await
            .expect_err("must fail");
        assert!(matches!(err, PipelineError::EmptyStore));
        assert!(embedder.calls.lock().expect("calls").is_empty());
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let embedder = sky_embedder();
        let generator = EchoGenerator::new();
        let passages = vec![Passage::new("x", vec![1.0, 0.0], "a.txt", 0)];

        let err = answer_query(&embedder, &generator, &passages, "   \n")
            .await
            .expect_err("must fail");
        assert_eq!(err.kind(), "invalid_input");
    }
}
