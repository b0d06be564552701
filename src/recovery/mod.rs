//! Crash recovery subsystem
//!
//! Reconciles three independently-failing artifacts (the data file, the
//! WAL segment and the modification log) into one consistent state, per
//! unsealed file, with no central transaction log tying them together.
//! The performer runs the per-file pass; the coordinator fans passes out
//! across series groups and picks each group's writable tail.

mod adapters;
mod coordinator;
mod errors;
mod performer;
mod redo;

pub use coordinator::{
    FileStatus, RecoveryCoordinator, SeriesGroupRecovery, UnsealedFile,
};
pub use errors::{RecoveryError, RecoveryErrorCode, RecoveryResult, Severity};
pub use performer::RecoverPerformer;
pub use redo::{redo_wal_entry, WalRead};
