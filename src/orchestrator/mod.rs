//! Ingest and answer flows, and the coordinator task that runs them.

mod coordinator;
mod pipeline;

pub use coordinator::{Completion, Orchestrator, OrchestratorSettings, StoreSummary};
pub use pipeline::{answer_query, embed_document, Answer, IngestReport};

#[cfg(test)]
pub(crate) use pipeline::testing;
