//! Error taxonomy.
//!
//! `ProviderError` covers everything that can go wrong talking to a model
//! provider. It is always recovered locally, by fallback delta or degraded
//! output, and never surfaces as a turn failure.
//! `EngineError` is the small set of infrastructure failures that do abort a
//! call into the engine.

use thiserror::Error;
use uuid::Uuid;

/// A model-provider call failed.
///
/// Cloneable so scripted test clients can replay a stored failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider call timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("provider returned HTTP {0}")]
    HttpStatus(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("provider returned an empty response")]
    EmptyResponse,

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Short classification label for traces and logs.
    pub fn label(&self) -> &'static str {
        match self {
            ProviderError::Timeout { .. } => "timeout",
            ProviderError::HttpStatus(_) => "http_status",
            ProviderError::Network(_) => "network",
            ProviderError::EmptyResponse => "empty_response",
            ProviderError::Malformed(_) => "malformed",
        }
    }
}

/// Failures surfaced to engine callers.
///
/// Model and analysis failures are absorbed inside the pipeline so a
/// user-visible response is always produced; only infrastructure problems
/// reach here.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("unknown session {0}")]
    SessionNotFound(Uuid),
}
