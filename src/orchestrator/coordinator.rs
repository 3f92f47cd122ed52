//! Coordinator task that owns the passage store.
//!
//! Callers talk to it through [`Orchestrator`], a cloneable handle. Each
//! ingest or answer request runs on its own worker task:
//!
//! - ingest workers hand their passage batch back to the coordinator, which
//!   appends it and then completes the caller's oneshot;
//! - answer workers read a snapshot of the store and complete the caller's
//!   oneshot directly.
//!
//! Only the coordinator mutates the store, so no lock guards it.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::pipeline::{answer_query, embed_document, Answer, IngestReport};
use crate::core::config::RagConfig;
use crate::llm::{Embedder, Generator};
use crate::rag::{Chunker, Passage, PassageStore, PipelineError};

const COMMAND_BUFFER: usize = 64;

/// One-shot completion for a submitted request.
pub type Completion<T> = oneshot::Receiver<Result<T, PipelineError>>;

#[derive(Debug, Clone, Serialize)]
pub struct StoreSummary {
    pub passages: usize,
    pub dimension: Option<usize>,
    pub sources: Vec<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub chunker: Chunker,
    pub deduplicate: bool,
}

impl OrchestratorSettings {
    pub fn from_config(config: &RagConfig) -> Result<Self, PipelineError> {
        Ok(Self {
            chunker: Chunker::new(config.chunk_size)?,
            deduplicate: config.deduplicate,
        })
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            chunker: Chunker::default(),
            deduplicate: false,
        }
    }
}

enum Command {
    Ingest {
        path: PathBuf,
        reply: oneshot::Sender<Result<IngestReport, PipelineError>>,
    },
    Answer {
        query: String,
        reply: oneshot::Sender<Result<Answer, PipelineError>>,
    },
    Summary {
        reply: oneshot::Sender<StoreSummary>,
    },
    Clear {
        reply: oneshot::Sender<usize>,
    },
}

struct IngestFinished {
    request_id: Uuid,
    path: PathBuf,
    result: Result<Vec<Passage>, PipelineError>,
    reply: oneshot::Sender<Result<IngestReport, PipelineError>>,
}

/// Cloneable handle to the coordinator task.
#[derive(Clone)]
pub struct Orchestrator {
    commands: mpsc::Sender<Command>,
}

impl Orchestrator {
    /// Start the coordinator on the current tokio runtime.
    pub fn spawn(
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        settings: OrchestratorSettings,
    ) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (finished_tx, finished_rx) = mpsc::unbounded_channel();

        let coordinator = Coordinator {
            store: PassageStore::new(),
            embedder,
            generator,
            settings,
            commands: commands_rx,
            finished_tx,
            finished_rx,
            in_flight_ingests: 0,
            closing: false,
        };
        tokio::spawn(coordinator.run());

        Self {
            commands: commands_tx,
        }
    }

    pub async fn submit_ingest(
        &self,
        path: impl Into<PathBuf>,
    ) -> Result<Completion<IngestReport>, PipelineError> {
        let (reply, completion) = oneshot::channel();
        self.send(Command::Ingest {
            path: path.into(),
            reply,
        })
        .await?;
        Ok(completion)
    }

    pub async fn submit_answer(
        &self,
        query: impl Into<String>,
    ) -> Result<Completion<Answer>, PipelineError> {
        let (reply, completion) = oneshot::channel();
        self.send(Command::Answer {
            query: query.into(),
            reply,
        })
        .await?;
        Ok(completion)
    }

    /// Ingest a document and wait for the store to be updated.
    pub async fn ingest(&self, path: impl Into<PathBuf>) -> Result<IngestReport, PipelineError> {
        let completion = self.submit_ingest(path).await?;
        completion.await.map_err(|_| PipelineError::Unavailable)?
    }

    /// Answer a query against the passages stored at submission time.
    pub async fn answer(&self, query: impl Into<String>) -> Result<Answer, PipelineError> {
        let completion = self.submit_answer(query).await?;
        completion.await.map_err(|_| PipelineError::Unavailable)?
    }

    pub async fn summary(&self) -> Result<StoreSummary, PipelineError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Summary { reply }).await?;
        rx.await.map_err(|_| PipelineError::Unavailable)
    }

    /// Drop every stored passage. Returns how many were removed.
    pub async fn clear(&self) -> Result<usize, PipelineError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Clear { reply }).await?;
        rx.await.map_err(|_| PipelineError::Unavailable)
    }

    async fn send(&self, command: Command) -> Result<(), PipelineError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PipelineError::Unavailable)
    }
}

struct Coordinator {
    store: PassageStore,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    settings: OrchestratorSettings,
    commands: mpsc::Receiver<Command>,
    finished_tx: mpsc::UnboundedSender<IngestFinished>,
    finished_rx: mpsc::UnboundedReceiver<IngestFinished>,
    in_flight_ingests: usize,
    closing: bool,
}

impl Coordinator {
    async fn run(mut self) {
        tracing::debug!("Coordinator started");
        loop {
            tokio::select! {
                command = self.commands.recv(), if !self.closing => match command {
                    Some(command) => self.dispatch(command),
                    None => self.closing = true,
                },
                Some(finished) = self.finished_rx.recv() => self.apply_ingest(finished),
            }

            if self.closing && self.in_flight_ingests == 0 {
                break;
            }
        }
        tracing::debug!("Coordinator stopped with {} passages", self.store.len());
    }

    fn dispatch(&mut self, command: Command) {
        match command {
            Command::Ingest { path, reply } => self.spawn_ingest(path, reply),
            Command::Answer { query, reply } => self.spawn_answer(query, reply),
            Command::Summary { reply } => {
                let _ = reply.send(StoreSummary {
                    passages: self.store.len(),
                    dimension: self.store.dimension(),
                    sources: self.store.sources(),
                });
            }
            Command::Clear { reply } => {
                let removed = self.store.clear();
                tracing::info!("Cleared {} passages", removed);
                let _ = reply.send(removed);
            }
        }
    }

    fn spawn_ingest(
        &mut self,
        path: PathBuf,
        reply: oneshot::Sender<Result<IngestReport, PipelineError>>,
    ) {
        let request_id = Uuid::new_v4();
        tracing::info!("[{}] Ingesting {}", request_id, path.display());

        let embedder = Arc::clone(&self.embedder);
        let chunker = self.settings.chunker;
        let finished_tx = self.finished_tx.clone();
        self.in_flight_ingests += 1;

        tokio::spawn(async move {
            let result = embed_document(embedder.as_ref(), chunker, &path).await;
            let _ = finished_tx.send(IngestFinished {
                request_id,
                path,
                result,
                reply,
            });
        });
    }

    fn apply_ingest(&mut self, finished: IngestFinished) {
        self.in_flight_ingests = self.in_flight_ingests.saturating_sub(1);
        let IngestFinished {
            request_id,
            path,
            result,
            reply,
        } = finished;

        let outcome = result.and_then(|batch| {
            let chunks = batch.len();
            let batch: Vec<Passage> = if self.settings.deduplicate {
                batch
                    .into_iter()
                    .filter(|p| !self.store.contains_text(&p.text))
                    .collect()
            } else {
                batch
            };
            let added = self.store.append(batch)?;
            Ok(IngestReport {
                source: path.clone(),
                chunks,
                added,
                skipped: chunks - added,
                total_passages: self.store.len(),
            })
        });

        match &outcome {
            Ok(report) => tracing::info!(
                "[{}] Ingested {}: {} passages added, {} total",
                request_id,
                path.display(),
                report.added,
                report.total_passages
            ),
            Err(err) => tracing::warn!(
                "[{}] Ingestion of {} failed: {}",
                request_id,
                path.display(),
                err
            ),
        }

        if reply.send(outcome).is_err() {
            tracing::debug!("[{}] Ingest caller went away before completion", request_id);
        }
    }

    fn spawn_answer(
        &self,
        query: String,
        reply: oneshot::Sender<Result<Answer, PipelineError>>,
    ) {
        let request_id = Uuid::new_v4();
        tracing::info!(
            "[{}] Answering query against {} passages",
            request_id,
            self.store.len()
        );

        let embedder = Arc::clone(&self.embedder);
        let generator = Arc::clone(&self.generator);
        let snapshot = self.store.snapshot();

        tokio::spawn(async move {
            let outcome =
                answer_query(embedder.as_ref(), generator.as_ref(), &snapshot, &query).await;
            if let Err(err) = &outcome {
                tracing::warn!("[{}] Query failed: {}", request_id, err);
            }
            let _ = reply.send(outcome);
        });
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::super::pipeline::testing::{EchoGenerator, FixedEmbedder};
    use super::*;

    fn text_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".txt")
            .tempfile()
            .expect("tempfile");
        write!(file, "{}", contents).expect("write");
        file
    }

    fn orchestrator(embedder: FixedEmbedder, deduplicate: bool) -> Orchestrator {
        Orchestrator::spawn(
            Arc::new(embedder),
            Arc::new(EchoGenerator::new()),
            OrchestratorSettings {
                chunker: Chunker::new(16).expect("size"),
                deduplicate,
            },
        )
    }

    fn embedder() -> FixedEmbedder {
        FixedEmbedder::new(
            &[
                ("The sky is blue.", vec![1.0, 0.0, 0.0]),
                ("Grass is green.", vec![0.0, 1.0, 0.0]),
                ("Roses are red.", vec![0.0, 0.0, 1.0]),
                ("What color is the sky?", vec![1.0, 0.0, 0.0]),
            ],
            vec![0.0, 0.0, 0.0],
        )
    }

    #[tokio::test]
    async fn answer_before_ingest_reports_empty_store() {
        let orchestrator = orchestrator(embedder(), false);
        let err = orchestrator
            .answer("What color is the sky?")
            .await
            .expect_err("must fail");
        assert!(matches!(err, PipelineError::EmptyStore));
    }

    #[tokio::test]
    async fn second_ingest_appends_to_first() {
        let orchestrator = orchestrator(embedder(), false);
        let first = text_file("The sky is blue.Grass is green.");
        let second = text_file("Roses are red.");

        let report = orchestrator.ingest(first.path()).await.expect("first ingest");
        assert_eq!((report.added, report.total_passages), (2, 2));

        let report = orchestrator.ingest(second.path()).await.expect("second ingest");
        assert_eq!((report.added, report.total_passages), (1, 3));

        let summary = orchestrator.summary().await.expect("summary");
        assert_eq!(summary.passages, 3);
        assert_eq!(summary.dimension, Some(3));
        assert_eq!(
            summary.sources,
            vec![first.path().to_path_buf(), second.path().to_path_buf()]
        );
    }

    #[tokio::test]
    async fn failed_ingest_leaves_store_unchanged() {
        let orchestrator = orchestrator(embedder().failing_on("Grass is green."), false);
        let good = text_file("Roses are red.");
        let bad = text_file("The sky is blue.Grass is green.");

        orchestrator.ingest(good.path()).await.expect("good ingest");
        let err = orchestrator.ingest(bad.path()).await.expect_err("must fail");
        assert_eq!(err.kind(), "service");

        let summary = orchestrator.summary().await.expect("summary");
        assert_eq!(summary.passages, 1);
    }

    #[tokio::test]
    async fn missing_file_is_reported_through_completion() {
        let orchestrator = orchestrator(embedder(), false);
        let completion = orchestrator
            .submit_ingest("/definitely/not/here.pdf")
            .await
            .expect("submitted");
        let err = completion
            .await
            .expect("completion delivered")
            .expect_err("must fail");
        assert_eq!(err.kind(), "extraction");
    }

    #[tokio::test]
    async fn deduplicate_skips_known_chunks() {
        let orchestrator = orchestrator(embedder(), true);
        let file = text_file("The sky is blue.Grass is green.");

        orchestrator.ingest(file.path()).await.expect("first ingest");
        let report = orchestrator.ingest(file.path()).await.expect("re-ingest");
        assert_eq!(report.chunks, 2);
        assert_eq!(report.added, 0);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.total_passages, 2);
    }

    #[tokio::test]
    async fn reingest_appends_by_default() {
        let orchestrator = orchestrator(embedder(), false);
        let file = text_file("The sky is blue.");

        orchestrator.ingest(file.path()).await.expect("first ingest");
        let report = orchestrator.ingest(file.path()).await.expect("re-ingest");
        assert_eq!(report.total_passages, 2);
    }

    #[tokio::test]
    async fn concurrent_answers_each_complete() {
        let orchestrator = orchestrator(embedder(), false);
        let file = text_file("The sky is blue.Grass is green.");
        orchestrator.ingest(file.path()).await.expect("ingest");

        let first = orchestrator
            .submit_answer("What color is the sky?")
            .await
            .expect("submitted");
        let second = orchestrator
            .submit_answer("Grass is green.")
            .await
            .expect("submitted");

        let (first, second) = tokio::join!(first, second);
        let first = first.expect("delivered").expect("answer");
        let second = second.expect("delivered").expect("answer");
        assert_eq!(first.passage, "The sky is blue.");
        assert_eq!(second.passage, "Grass is green.");
    }

    #[tokio::test]
    async fn clear_empties_the_store() {
        let orchestrator = orchestrator(embedder(), false);
        let file = text_file("The sky is blue.Grass is green.");
        orchestrator.ingest(file.path()).await.expect("ingest");

        assert_eq!(orchestrator.clear().await.expect("clear"), 2);
        let err = orchestrator.answer("What color is the sky?").await.expect_err("empty");
        assert!(matches!(err, PipelineError::EmptyStore));
    }

    #[tokio::test]
    async fn pending_ingest_completes_after_handles_drop() {
        let orchestrator = orchestrator(embedder(), false);
        let file = text_file("The sky is blue.");
        let completion = orchestrator.submit_ingest(file.path()).await.expect("submitted");
        drop(orchestrator);

        let report = tokio::time::timeout(Duration::from_secs(5), completion)
            .await
            .expect("completed in time")
            .expect("delivered")
            .expect("ingest");
        assert_eq!(report.added, 1);
    }
}
