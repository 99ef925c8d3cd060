// src/error.rs

//! Engine error taxonomy. A cache miss is deliberately not represented
//! here — it is the `None` arm of `SessionStore::get` and triggers the
//! fetch-by-id fallback, not an error path.

/// Errors surfaced by the retrieval & ranking engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Coordinates could not be mapped to a time zone. Non-fatal: callers
    /// degrade to UTC and mark the open-status result low-confidence.
    #[error("geo resolution failed: {0}")]
    GeoResolution(String),

    /// The backing store could not be reached or answered with a server
    /// error. Transient — the caller may retry with backoff.
    #[error("venue store unavailable: {0}")]
    StoreUnavailable(String),

    /// The query itself was rejected (invalid parameters, bad filter).
    /// Fatal for this call; retrying unchanged is a caller bug.
    #[error("malformed query: {0}")]
    MalformedQuery(String),

    /// Embedding generation failed; without a query vector the semantic
    /// stage cannot run, so this aborts the call.
    #[error("embedding error: {0}")]
    Embedding(String),
}

impl EngineError {
    /// True for failures the caller may retry (with backoff) without
    /// changing the request.
    pub fn is_transient(&self) -> bool {
        matches!(self, EngineError::StoreUnavailable(_))
    }
}
