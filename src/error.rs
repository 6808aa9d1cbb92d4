// src/error.rs
//! Error taxonomy for a pipeline run. Only `Validation` and `Lookup` are
//! surfaced to the HTTP caller as non-2xx; summarizer trouble is absorbed by
//! the truncation fallback and persistence trouble is reported per item.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Malformed target address; fatal before any side effect.
    #[error("invalid target address: {0}")]
    Validation(String),

    /// The idea id does not resolve in the directory.
    #[error("unresolvable idea target: {0}")]
    Lookup(String),

    /// Summarizer unavailable, timed out, or returned garbage. Recovered
    /// locally; never surfaced as a run failure.
    #[error("external service failure: {0}")]
    ExternalService(String),

    /// Storage failure for one candidate; counted, does not abort the run.
    #[error("persistence failure: {0}")]
    Persistence(String),
}
