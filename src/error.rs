use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for the triple store.
///
/// Each layer defines its own error type. Callers match on the top-level
/// variant to tell caller mistakes (`Validation`, `EmbedderRequired`) apart
/// from infrastructure failures (`Embedding`, `Backend`).
#[derive(Debug, Error)]
pub enum StoreError {
    // ── Construction / query validation ─────────────────────────────────
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),

    // ── Capability ──────────────────────────────────────────────────────
    /// Semantic text search was requested on a store built without an
    /// embedder. There is no keyword fallback.
    #[error("query_text requires a store constructed with an embedder")]
    EmbedderRequired,

    // ── Embedding adapter ───────────────────────────────────────────────
    #[error("embedding: {0}")]
    Embedding(#[from] EmbeddingError),

    // ── Persistent backend ──────────────────────────────────────────────
    #[error("backend: {0}")]
    Backend(#[from] BackendError),

    // ── Config ──────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),
}

// ─── Validation errors ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid scope {0:?}: expected one of run, session, global")]
    InvalidScope(String),

    #[error("{0} must not be empty")]
    EmptyTerm(&'static str),

    #[error("{0} timestamp must not be empty")]
    EmptyTimestamp(&'static str),

    #[error("valid_until {until} precedes valid_from {from}")]
    InvertedValidity { from: String, until: String },

    #[error("confidence must be finite, got {0}")]
    NonFiniteConfidence(f64),

    #[error("query text must not be empty")]
    EmptyQueryText,

    #[error("query vector must not be empty")]
    EmptyQueryVector,

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    VectorDimensionMismatch { expected: usize, actual: usize },

    #[error("assertion_id {0} was already written")]
    DuplicateAssertionId(String),
}

// ─── Embedding adapter errors ────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("embedding endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed embedding response: {0}")]
    MalformedResponse(String),

    #[error("embedding count mismatch: sent {expected} texts, got {actual} vectors")]
    CountMismatch { expected: usize, actual: usize },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid embedder configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Provider(String),
}

// ─── Backend errors ──────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum BackendError {
    #[cfg(feature = "lancedb")]
    #[error("lancedb: {0}")]
    Lance(#[from] lancedb::Error),

    #[cfg(feature = "lancedb")]
    #[error("arrow: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    #[error("json codec: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("schema mismatch: {0}")]
    Schema(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("runtime: {0}")]
    Runtime(String),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {0}")]
    Validation(String),
}

// ─── Convenience conversions ─────────────────────────────────────────────────

#[cfg(feature = "lancedb")]
impl From<lancedb::Error> for StoreError {
    fn from(err: lancedb::Error) -> Self {
        Self::Backend(BackendError::Lance(err))
    }
}

#[cfg(feature = "lancedb")]
impl From<arrow_schema::ArrowError> for StoreError {
    fn from(err: arrow_schema::ArrowError) -> Self {
        Self::Backend(BackendError::Arrow(err))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Backend(BackendError::Codec(err))
    }
}

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
