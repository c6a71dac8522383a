//! Shared error type used across all evaluation-core crates.
//!
//! Variants map onto the typed error kinds the orchestrator dispatches on
//! (see `eval-gateway::orchestrator`): only the orchestrator decides whether
//! a given error is retried, substituted with a sentinel score, or surfaced
//! to the caller.

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("guardrail blocked: {0}")]
    GuardrailBlocked(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("context overflow: {0}")]
    ContextOverflow(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("sandbox failure: {0}")]
    SandboxFailure(String),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("transient: {0}")]
    Transient(String),

    #[error("fatal: {0}")]
    Fatal(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether a caller may retry this error after a backoff.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Error::RateLimited(_) | Error::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
