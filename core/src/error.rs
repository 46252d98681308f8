use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid ruleset pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Ruleset of kind {actual:?} supplied where {expected:?} is required")]
    RulesetKindMismatch {
        expected: crate::event::EventKind,
        actual: crate::event::EventKind,
    },

    #[error("Malformed context on line {line}: {source}")]
    MalformedContext {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid timestamp on line {line}: '{value}'")]
    InvalidTimestamp { line: usize, value: String },

    #[error("Payment configuration has no 'DEFAULT' entry")]
    MissingDefault,

    #[error("Payment type '{name}' is referenced by configuration but was never seeded")]
    UnseededPaymentType { name: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type IngestResult<T> = Result<T, IngestError>;
