//! Query answering over the loaded corpus.
//!
//! [`QueryEngine`] runs retrieval, ranking and the confidence gate under a
//! per-request deadline and produces one of four outcomes.

pub mod ask;
pub mod types;

pub use ask::QueryEngine;
pub use types::{
    ActionPayload, ActionSpec, AskResponse, HealthReport, InboundQuery, LlmMeta, Outcome, Reply,
    ResolvedQuery, ResponseMeta, SuggestedAction,
};
