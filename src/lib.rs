// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod ai_adapter;
pub mod config;
pub mod errors;
pub mod ingest;
pub mod notify;
pub mod pipeline;
pub mod render;
pub mod summarize;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::config::AppConfig;
pub use crate::errors::{FetchError, ModelCallError, RenderError, RunError, SendError};
pub use crate::ingest::types::{RawPost, TimeFilter};
pub use crate::pipeline::{Orchestrator, RunOutcome};
pub use crate::summarize::types::{Digest, Insight};
pub use crate::summarize::{Summarizer, SummarizerParams};
