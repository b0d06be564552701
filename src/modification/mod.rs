//! Deletion records and the per-file modification log
//!
//! Out-of-band deletes against already-written data are never applied to
//! the columnar file in place; they are recorded here and merged at read
//! time by the query layer. Each record is versioned by the byte offset
//! the data file had reached when the deletion was created.

mod errors;
mod log;
mod record;

pub use errors::{ModificationError, ModificationResult};
pub use log::{mods_path_for, ModificationIter, ModificationLog, MODS_SUFFIX};
pub use record::Deletion;
