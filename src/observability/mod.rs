//! Observability subsystem
//!
//! Structured JSON logging for the storage engine: one line per event,
//! explicit severity, deterministic key order. Logging is synchronous and
//! read-only; it never influences execution.

mod logger;

pub use logger::{Logger, Severity};
