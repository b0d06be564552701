//! Data file error types
//!
//! Error codes:
//! - CHRONO_TSFILE_WRITE_FAILED (ERROR severity)
//! - CHRONO_TSFILE_READ_FAILED (ERROR severity)
//! - CHRONO_TSFILE_INVALID_WRITE (ERROR severity)
//! - CHRONO_TSFILE_CORRUPTION (FATAL severity)

use std::fmt;
use std::io;

/// Severity levels for data file errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, caller may continue
    Error,
    /// The file cannot be trusted; recovery must decide its fate
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Data file error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TsFileErrorCode {
    /// A write or fsync to the data file failed
    ChronoTsfileWriteFailed,
    /// A read from the data file failed
    ChronoTsfileReadFailed,
    /// The caller handed the writer inconsistent data
    ChronoTsfileInvalidWrite,
    /// The file's structure is not parseable where it must be
    ChronoTsfileCorruption,
}

impl TsFileErrorCode {
    /// Returns the string code.
    pub fn code(&self) -> &'static str {
        match self {
            TsFileErrorCode::ChronoTsfileWriteFailed => "CHRONO_TSFILE_WRITE_FAILED",
            TsFileErrorCode::ChronoTsfileReadFailed => "CHRONO_TSFILE_READ_FAILED",
            TsFileErrorCode::ChronoTsfileInvalidWrite => "CHRONO_TSFILE_INVALID_WRITE",
            TsFileErrorCode::ChronoTsfileCorruption => "CHRONO_TSFILE_CORRUPTION",
        }
    }

    /// Returns the severity level for this error.
    pub fn severity(&self) -> Severity {
        match self {
            TsFileErrorCode::ChronoTsfileWriteFailed => Severity::Error,
            TsFileErrorCode::ChronoTsfileReadFailed => Severity::Error,
            TsFileErrorCode::ChronoTsfileInvalidWrite => Severity::Error,
            TsFileErrorCode::ChronoTsfileCorruption => Severity::Fatal,
        }
    }
}

impl fmt::Display for TsFileErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Data file error with context.
#[derive(Debug)]
pub struct TsFileError {
    /// Error code
    code: TsFileErrorCode,
    /// Human-readable message
    message: String,
    /// Byte offset if applicable
    offset: Option<u64>,
}

impl TsFileError {
    /// Create a write failure error from an I/O error.
    pub fn write_failed(context: impl Into<String>, err: io::Error) -> Self {
        Self {
            code: TsFileErrorCode::ChronoTsfileWriteFailed,
            message: format!("{}: {}", context.into(), err),
            offset: None,
        }
    }

    /// Create a read failure error from an I/O error.
    pub fn read_failed(context: impl Into<String>, err: io::Error) -> Self {
        Self {
            code: TsFileErrorCode::ChronoTsfileReadFailed,
            message: format!("{}: {}", context.into(), err),
            offset: None,
        }
    }

    /// Create an invalid-write error (caller misuse, not I/O).
    pub fn invalid_write(reason: impl Into<String>) -> Self {
        Self {
            code: TsFileErrorCode::ChronoTsfileInvalidWrite,
            message: reason.into(),
            offset: None,
        }
    }

    /// Create a corruption error anchored at a byte offset.
    pub fn corruption_at_offset(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            code: TsFileErrorCode::ChronoTsfileCorruption,
            message: format!("corruption at offset {}: {}", offset, reason.into()),
            offset: Some(offset),
        }
    }

    /// Create a corruption error with no specific offset.
    pub fn corruption(reason: impl Into<String>) -> Self {
        Self {
            code: TsFileErrorCode::ChronoTsfileCorruption,
            message: reason.into(),
            offset: None,
        }
    }

    /// Returns the error code.
    pub fn code(&self) -> TsFileErrorCode {
        self.code
    }

    /// Returns the severity level.
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the offset if applicable.
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    /// Returns whether this error is fatal.
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for TsFileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for TsFileError {}

/// Result type for data file operations.
pub type TsFileResult<T> = Result<T, TsFileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corruption_is_fatal() {
        let err = TsFileError::corruption_at_offset(128, "checksum mismatch");
        assert!(err.is_fatal());
        assert_eq!(err.offset(), Some(128));
        let display = format!("{}", err);
        assert!(display.contains("CHRONO_TSFILE_CORRUPTION"));
        assert!(display.contains("FATAL"));
    }

    #[test]
    fn test_write_failure_is_not_fatal() {
        let io_err = io::Error::new(io::ErrorKind::Other, "disk full");
        let err = TsFileError::write_failed("flushing chunk groups", io_err);
        assert!(!err.is_fatal());
        assert_eq!(err.code().code(), "CHRONO_TSFILE_WRITE_FAILED");
    }
}
