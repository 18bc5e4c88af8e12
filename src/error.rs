use thiserror::Error;

/// Errors raised by the normalization engine.
///
/// Only `UnsupportedBackend` is fatal; everything else degrades to
/// "no data for this mount" at the parser boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum QuotaError {
    #[error("{backend}: {reason}")]
    Parse { backend: &'static str, reason: String },

    #[error("unsupported quota backend: {0:?}")]
    UnsupportedBackend(String),

    #[error("not a scaled value: {0:?}")]
    InvalidScaled(String),
}

impl QuotaError {
    pub fn parse(backend: &'static str, reason: impl Into<String>) -> Self {
        QuotaError::Parse { backend, reason: reason.into() }
    }
}
