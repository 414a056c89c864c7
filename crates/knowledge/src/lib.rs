//! Question answering over a curated document collection.
//!
//! Documents carry precomputed embeddings. A query is embedded, scored
//! against the collection, re-ranked by intent heuristics and resolved by a
//! confidence gate into a direct answer, a list of choices, a request to
//! refine, or a tip. Optional generation steps polish the result within a
//! per-request latency budget.

pub mod answer;
pub mod augment;
pub mod corpus;
pub mod deadline;
pub mod embeddings;
pub mod gate;
pub mod intent;
pub mod rag;
pub mod retrieval;
pub mod summary;
pub mod text;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use corpus::{CorpusSnapshot, CorpusSource, CorpusStore, InMemorySource, JsonFileSource};
pub use deadline::{BudgetReport, Clock, ManualClock, SystemClock};
pub use embeddings::{create_provider, EmbeddingProvider};
pub use rag::{AskResponse, HealthReport, InboundQuery, Outcome, QueryEngine, Reply};
pub use types::{CorpusStats, Document, Hit, TimelineEntry};
