//! Schema error types

use thiserror::Error;

/// Errors from series registration and schema lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The path has no measurement segment, so it cannot name a series.
    #[error("'{path}' is a device path, not a series: a series needs a measurement segment")]
    NotASeries {
        /// The offending path
        path: String,
    },

    /// The series is already registered.
    #[error("series '{path}' is already registered")]
    DuplicateSeries {
        /// The already-registered path
        path: String,
    },
}

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;
