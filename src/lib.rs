// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod config;
pub mod content;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod repetition;
pub mod scoring;
pub mod signal;
pub mod store;
pub mod summarize;
pub mod target;
pub mod urls;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::config::PipelineConfig;
pub use crate::error::IngestError;
pub use crate::pipeline::{InboundEmail, IngestReport, Pipeline};
