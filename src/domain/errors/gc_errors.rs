use thiserror::Error;

use super::StorageError;
use crate::domain::models::GcReport;

/// Errors that stop a sweep from making progress.
///
/// Per-item problems (one upload that cannot be aborted, one marker that
/// cannot be parsed) are not represented here; they are collected on the
/// sweep report instead.
#[derive(Debug, Error)]
pub enum GcError {
    #[error("{operation} failed for prefix '{prefix}': {source}")]
    Listing {
        operation: &'static str,
        prefix: String,
        #[source]
        source: StorageError,
    },

    #[error("{operation} reported a truncated page without a continuation cursor for prefix '{prefix}'")]
    MissingCursor {
        operation: &'static str,
        prefix: String,
    },

    #[error("Run deadline exceeded before {stage}")]
    DeadlineExceeded { stage: &'static str },

    /// A fatal error ended the run; `report` holds what was done up to then
    #[error("Run aborted: {source}")]
    Aborted {
        report: Box<GcReport>,
        #[source]
        source: Box<GcError>,
    },
}

impl GcError {
    /// Whether the error must end the whole run rather than just the
    /// current repository.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GcError::DeadlineExceeded { .. } | GcError::Aborted { .. }
        )
    }
}

/// Result type for sweep operations
pub type GcResult<T> = Result<T, GcError>;

/// Failure to decode the content of a `startedat` marker object
#[derive(Debug, Error)]
pub enum MarkerParseError {
    #[error("Marker content is not valid UTF-8")]
    NotUtf8,

    #[error("Marker content '{value}' does not match YYYY-MM-DDTHH:MM:SSZ")]
    UnexpectedShape { value: String },

    #[error("Marker content '{value}' is not a valid timestamp: {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}
