//! Write-ahead log subsystem
//!
//! Durable record of operations not yet reflected in a data file. Each
//! in-memory table logs to its own segment; entries are framed, checksummed
//! and replayed strictly in order during recovery.

mod checksum;
mod entry;
mod errors;
mod reader;
mod writer;

pub use checksum::compute_checksum;
pub use entry::{Operation, WalEntry};
pub use errors::{Severity, WalError, WalErrorCode, WalResult};
pub use reader::WalReader;
pub use writer::{segment_path, WalWriter};
