//! Error taxonomy for the answering pipeline.
//!
//! Startup errors ([`RagError::KnowledgeBase`], [`RagError::IndexCorrupt`],
//! [`RagError::CredentialMissing`]) are fatal; the pipeline never reaches
//! `Ready`. Per-call errors ([`RagError::Synthesis`], [`RagError::Embedding`])
//! are surfaced to the caller, which decides whether to retry; the pipeline
//! itself never retries and never substitutes a partial answer.

use std::path::PathBuf;

/// Errors produced by the retrieval-augmented answering pipeline.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    /// The knowledge-base directory is missing or unreadable.
    #[error("knowledge base not found at {path}: {reason}")]
    KnowledgeBase { path: PathBuf, reason: String },

    /// The persisted index is unreadable or was built with a different
    /// embedding model or dimensionality. Recovery is an explicit rebuild
    /// (`sage index --rebuild`), never attempted automatically.
    #[error("persisted index is unusable: {0}")]
    IndexCorrupt(String),

    /// A required API credential is not present in the environment.
    #[error("required credential {0} is not set")]
    CredentialMissing(&'static str),

    /// The embedding provider failed to produce a vector.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The remote completion endpoint failed (network, auth, rate limit,
    /// or server error).
    #[error("answer synthesis failed: {0}")]
    Synthesis(String),

    /// `ask()` was invoked before the pipeline reached `Ready`.
    #[error("pipeline is not ready; call init() first")]
    NotReady,

    /// An index storage operation failed.
    #[error("index storage error: {0}")]
    Storage(#[from] sqlx::Error),
}
