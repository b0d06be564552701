//! WAL error types
//!
//! Error codes:
//! - CHRONO_WAL_APPEND_FAILED (ERROR severity)
//! - CHRONO_WAL_READ_FAILED (ERROR severity)
//! - CHRONO_WAL_FSYNC_FAILED (FATAL severity)
//! - CHRONO_WAL_CORRUPTION (FATAL severity)

use std::fmt;
use std::io;

/// Severity levels for WAL errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, caller may continue
    Error,
    /// Durability can no longer be guaranteed
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

/// WAL-specific error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalErrorCode {
    /// WAL write failed
    ChronoWalAppendFailed,
    /// WAL read failed
    ChronoWalReadFailed,
    /// WAL fsync failed
    ChronoWalFsyncFailed,
    /// WAL checksum or framing failure
    ChronoWalCorruption,
}

impl WalErrorCode {
    /// Returns the string code.
    pub fn code(&self) -> &'static str {
        match self {
            WalErrorCode::ChronoWalAppendFailed => "CHRONO_WAL_APPEND_FAILED",
            WalErrorCode::ChronoWalReadFailed => "CHRONO_WAL_READ_FAILED",
            WalErrorCode::ChronoWalFsyncFailed => "CHRONO_WAL_FSYNC_FAILED",
            WalErrorCode::ChronoWalCorruption => "CHRONO_WAL_CORRUPTION",
        }
    }

    /// Returns the severity level for this error.
    pub fn severity(&self) -> Severity {
        match self {
            WalErrorCode::ChronoWalAppendFailed => Severity::Error,
            WalErrorCode::ChronoWalReadFailed => Severity::Error,
            WalErrorCode::ChronoWalFsyncFailed => Severity::Fatal,
            WalErrorCode::ChronoWalCorruption => Severity::Fatal,
        }
    }
}

impl fmt::Display for WalErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// WAL error with context.
#[derive(Debug)]
pub struct WalError {
    /// Error code
    code: WalErrorCode,
    /// Human-readable message
    message: String,
    /// Byte offset if applicable
    offset: Option<u64>,
}

impl WalError {
    /// Create an append failure error.
    pub fn append_failed(context: impl Into<String>, err: io::Error) -> Self {
        Self {
            code: WalErrorCode::ChronoWalAppendFailed,
            message: format!("{}: {}", context.into(), err),
            offset: None,
        }
    }

    /// Create a read failure error.
    pub fn read_failed(context: impl Into<String>, err: io::Error) -> Self {
        Self {
            code: WalErrorCode::ChronoWalReadFailed,
            message: format!("{}: {}", context.into(), err),
            offset: None,
        }
    }

    /// Create an fsync failure error.
    pub fn fsync_failed(context: impl Into<String>, err: io::Error) -> Self {
        Self {
            code: WalErrorCode::ChronoWalFsyncFailed,
            message: format!("{}: {}", context.into(), err),
            offset: None,
        }
    }

    /// Create a corruption error anchored at a byte offset.
    pub fn corruption(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            code: WalErrorCode::ChronoWalCorruption,
            message: format!("WAL corruption at offset {}: {}", offset, reason.into()),
            offset: Some(offset),
        }
    }

    /// Returns the error code.
    pub fn code(&self) -> WalErrorCode {
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

impl fmt::Display for WalError {
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

impl std::error::Error for WalError {}

/// Result type for WAL operations.
pub type WalResult<T> = Result<T, WalError>;
