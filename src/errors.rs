// src/errors.rs
//! Error kinds of a digest run.
//!
//! Only `FetchError` aborts a run. Model-call failures are collected per batch,
//! render failures signal a broken `Digest` invariant, and send failures leave
//! the rendered HTML on disk.

use thiserror::Error;

/// The forum could not provide anything to summarize.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no communities configured")]
    NoCommunities,

    #[error("request to r/{community} failed: {reason}")]
    Http { community: String, reason: String },

    #[error("r/{community} answered with HTTP {status}")]
    Status { community: String, status: u16 },

    #[error("could not decode listing for r/{community}: {reason}")]
    Decode { community: String, reason: String },

    #[error("every community failed; last error: {last}")]
    AllCommunitiesFailed { last: Box<FetchError> },
}

/// A single language-model call did not produce usable output.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelCallError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider returned an empty response")]
    EmptyResponse,

    #[error("call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("response contained no parseable records")]
    NoRecords,

    #[error("language model is not configured")]
    Disabled,
}

impl From<reqwest::Error> for ModelCallError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            ModelCallError::Transport(format!("timeout: {error}"))
        } else {
            ModelCallError::Transport(error.to_string())
        }
    }
}

/// The digest violated a structural invariant the assembler guarantees.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("category group {0:?} has no insights")]
    EmptyGroup(String),

    #[error("insight {title:?} has no source url")]
    MissingSource { title: String },

    #[error("formatting failed")]
    Format(#[from] std::fmt::Error),
}

/// The rendered digest could not be delivered.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("invalid address {address:?}: {reason}")]
    Address { address: String, reason: String },

    #[error("could not build message: {0}")]
    Build(String),

    #[error("smtp transport failed: {0}")]
    Transport(String),

    #[error("could not write digest file: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a run stopped before any email was attempted.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("render failed: {0}")]
    Render(#[from] RenderError),
}
