//! Modification log error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::series::PathError;

/// Errors from deletion records and the modification log.
#[derive(Debug, Error)]
pub enum ModificationError {
    /// A deletion's interval is inverted.
    #[error("invalid deletion range: start {start} > end {end}")]
    InvalidRange {
        /// Interval start
        start: i64,
        /// Interval end
        end: i64,
    },

    /// A log record failed to frame or parse.
    #[error("corrupt deletion record at offset {offset}: {reason}")]
    Corrupt {
        /// Byte offset of the record in the log
        offset: u64,
        /// Why it was rejected
        reason: String,
    },

    /// Reading or writing the log file failed.
    #[error("modification log I/O on {path}: {source}")]
    Io {
        /// The log file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A record carried a malformed series path.
    #[error(transparent)]
    Path(#[from] PathError),
}

/// Result type for modification log operations.
pub type ModificationResult<T> = Result<T, ModificationError>;
