//! Time-range index error types
//!
//! Error codes:
//! - CHRONO_RESOURCE_IO_FAILED (ERROR severity)
//! - CHRONO_RESOURCE_DEVICE_NOT_FOUND (ERROR severity)
//! - CHRONO_RESOURCE_CORRUPTION (FATAL severity)

use std::fmt;
use std::io;

/// Severity levels for index errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, caller may continue
    Error,
    /// The sidecar cannot be trusted
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

/// Time-range index error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceErrorCode {
    /// Reading or writing the sidecar file failed
    ChronoResourceIoFailed,
    /// A queried device has no recorded time range
    ChronoResourceDeviceNotFound,
    /// The sidecar file's structure is not parseable
    ChronoResourceCorruption,
}

impl ResourceErrorCode {
    /// Returns the string code.
    pub fn code(&self) -> &'static str {
        match self {
            ResourceErrorCode::ChronoResourceIoFailed => "CHRONO_RESOURCE_IO_FAILED",
            ResourceErrorCode::ChronoResourceDeviceNotFound => "CHRONO_RESOURCE_DEVICE_NOT_FOUND",
            ResourceErrorCode::ChronoResourceCorruption => "CHRONO_RESOURCE_CORRUPTION",
        }
    }

    /// Returns the severity level for this error.
    pub fn severity(&self) -> Severity {
        match self {
            ResourceErrorCode::ChronoResourceIoFailed => Severity::Error,
            ResourceErrorCode::ChronoResourceDeviceNotFound => Severity::Error,
            ResourceErrorCode::ChronoResourceCorruption => Severity::Fatal,
        }
    }
}

impl fmt::Display for ResourceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Time-range index error with context.
#[derive(Debug)]
pub struct ResourceError {
    /// Error code
    code: ResourceErrorCode,
    /// Human-readable message
    message: String,
}

impl ResourceError {
    /// Create an I/O failure error.
    pub fn io_failed(context: impl Into<String>, err: io::Error) -> Self {
        Self {
            code: ResourceErrorCode::ChronoResourceIoFailed,
            message: format!("{}: {}", context.into(), err),
        }
    }

    /// Create a device-not-found error.
    pub fn device_not_found(device: impl Into<String>) -> Self {
        Self {
            code: ResourceErrorCode::ChronoResourceDeviceNotFound,
            message: format!("no time range recorded for device '{}'", device.into()),
        }
    }

    /// Create a sidecar corruption error.
    pub fn corruption(reason: impl Into<String>) -> Self {
        Self {
            code: ResourceErrorCode::ChronoResourceCorruption,
            message: reason.into(),
        }
    }

    /// Returns the error code.
    pub fn code(&self) -> ResourceErrorCode {
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
}

impl fmt::Display for ResourceError {
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

impl std::error::Error for ResourceError {}

/// Result type for time-range index operations.
pub type ResourceResult<T> = Result<T, ResourceError>;
