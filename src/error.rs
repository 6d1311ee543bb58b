use thiserror::Error;

/// Errors surfaced by the loading pipeline and the persistence boundary.
///
/// Pattern compilation failures inside the filter engine are not errors; they
/// degrade to literal substring matching (see [`crate::query::CompiledPattern`]).
#[derive(Debug, Error)]
pub enum IngotError {
    /// Input text was not valid JSON
    #[error("invalid JSON: {0}")]
    Parse(String),

    /// The extraction path did not resolve against the parsed document
    #[error("could not find path: {path}")]
    InvalidPath { path: String },

    /// The value to flatten was neither an object nor an array
    #[error("JSON must be an object or array of objects, found {found}")]
    InvalidShape { found: &'static str },

    /// A load was requested while another load was still running
    #[error("a load is already in progress")]
    LoadInProgress,

    /// The key-value store rejected a read or write
    #[error("state store error: {0}")]
    Store(String),

    /// State could not be encoded for, or decoded from, the key-value store
    #[error("failed to (de)serialize state: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IngotError {
    pub(crate) fn invalid_path(path: impl Into<String>) -> Self {
        IngotError::InvalidPath { path: path.into() }
    }
}

pub type Result<T> = std::result::Result<T, IngotError>;
