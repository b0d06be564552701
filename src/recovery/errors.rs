//! Recovery error types
//!
//! Error codes:
//! - CHRONO_RECOVERY_CORRUPT_FILE (FATAL)
//! - CHRONO_RECOVERY_TRUNCATION_FAILED (FATAL)
//! - CHRONO_RECOVERY_WAL_CORRUPTION (FATAL)
//! - CHRONO_RECOVERY_REPLAY_FAILED (FATAL)
//! - CHRONO_RECOVERY_FAILED (FATAL)
//!
//! Recovery is all-or-nothing per file: every error here aborts that
//! file's pass and is surfaced to the caller. Nothing is downgraded to
//! "treat as empty" and nothing is retried.

use std::fmt;

/// Severity levels for recovery errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The file's recovery must abort
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Recovery-specific error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryErrorCode {
    /// No valid structural prefix could be found in the data file
    ChronoRecoveryCorruptFile,
    /// The file system rejected the truncation
    ChronoRecoveryTruncationFailed,
    /// The WAL segment failed framing or checksum validation
    ChronoRecoveryWalCorruption,
    /// A WAL entry could not be redone
    ChronoRecoveryReplayFailed,
    /// General recovery failure
    ChronoRecoveryFailed,
}

impl RecoveryErrorCode {
    /// Returns the string code.
    pub fn code(&self) -> &'static str {
        match self {
            RecoveryErrorCode::ChronoRecoveryCorruptFile => "CHRONO_RECOVERY_CORRUPT_FILE",
            RecoveryErrorCode::ChronoRecoveryTruncationFailed => {
                "CHRONO_RECOVERY_TRUNCATION_FAILED"
            }
            RecoveryErrorCode::ChronoRecoveryWalCorruption => "CHRONO_RECOVERY_WAL_CORRUPTION",
            RecoveryErrorCode::ChronoRecoveryReplayFailed => "CHRONO_RECOVERY_REPLAY_FAILED",
            RecoveryErrorCode::ChronoRecoveryFailed => "CHRONO_RECOVERY_FAILED",
        }
    }

    /// Returns the severity level for this error.
    pub fn severity(&self) -> Severity {
        // Recovery has no partial-success state.
        Severity::Fatal
    }
}

impl fmt::Display for RecoveryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Recovery error with context.
#[derive(Debug)]
pub struct RecoveryError {
    /// Error code
    code: RecoveryErrorCode,
    /// Human-readable message
    message: String,
    /// Byte offset if applicable
    offset: Option<u64>,
}

impl RecoveryError {
    /// Create a corrupt-file error.
    pub fn corrupt_file(reason: impl Into<String>) -> Self {
        Self {
            code: RecoveryErrorCode::ChronoRecoveryCorruptFile,
            message: reason.into(),
            offset: None,
        }
    }

    /// Create a truncation failure error.
    pub fn truncation_failed(reason: impl Into<String>) -> Self {
        Self {
            code: RecoveryErrorCode::ChronoRecoveryTruncationFailed,
            message: reason.into(),
            offset: None,
        }
    }

    /// Create a WAL corruption error anchored at a segment offset.
    pub fn wal_corruption(offset: u64, reason: impl Into<String>) -> Self {
        Self {
            code: RecoveryErrorCode::ChronoRecoveryWalCorruption,
            message: format!("WAL corruption at offset {}: {}", offset, reason.into()),
            offset: Some(offset),
        }
    }

    /// Create a replay failure error.
    pub fn replay_failed(reason: impl Into<String>) -> Self {
        Self {
            code: RecoveryErrorCode::ChronoRecoveryReplayFailed,
            message: reason.into(),
            offset: None,
        }
    }

    /// Create a general recovery failure error.
    pub fn recovery_failed(reason: impl Into<String>) -> Self {
        Self {
            code: RecoveryErrorCode::ChronoRecoveryFailed,
            message: reason.into(),
            offset: None,
        }
    }

    /// Returns the error code.
    pub fn code(&self) -> RecoveryErrorCode {
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

    /// Returns whether this is a fatal error.
    pub fn is_fatal(&self) -> bool {
        true
    }
}

impl fmt::Display for RecoveryError {
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

impl std::error::Error for RecoveryError {}

/// Result type for recovery operations.
pub type RecoveryResult<T> = Result<T, RecoveryError>;
