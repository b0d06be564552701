//! WAL entry redo dispatch
//!
//! Given one logged operation, reproduce its exact effect against the
//! in-recovery file target:
//!
//! - an inserted row materializes into the file's in-memory table and
//!   widens the time-range index for its device;
//! - a deleted range becomes a deletion record stamped with the data
//!   file's *current* size (capturing how much of the file the delete
//!   provably covers), appended to the modification log, and applied to
//!   any rows already redone for the same range. The index is not
//!   narrowed: ranges only describe what was ever written.
//!
//! A redo that cannot be completed aborts the whole pass; skipping an
//! entry would silently under-apply mutations.

use crate::memtable::MemTable;
use crate::modification::{Deletion, ModificationLog};
use crate::resource::TimeRangeIndex;
use crate::schema::SchemaProvider;
use crate::wal::{Operation, WalEntry};

use super::errors::{RecoveryError, RecoveryResult};

/// An ordered, finite source of WAL entries.
///
/// `Option<W>` is itself a source: `None` reads as an empty segment, which
/// is how a file whose table never logged anything is replayed.
pub trait WalRead {
    /// Reads the next entry.
    ///
    /// - `Ok(Some(entry))` on a valid entry
    /// - `Ok(None)` at end of the segment
    /// - `Err` on corruption (fatal to the recovery pass)
    fn read_next(&mut self) -> RecoveryResult<Option<WalEntry>>;
}

impl<W: WalRead> WalRead for Option<W> {
    fn read_next(&mut self) -> RecoveryResult<Option<WalEntry>> {
        match self {
            Some(source) => source.read_next(),
            None => Ok(None),
        }
    }
}

/// Redoes one WAL entry against the recovery target.
///
/// `data_file_size` must be the data file's size at redo time; it becomes
/// the file offset of any deletion record this entry produces.
pub fn redo_wal_entry<S: SchemaProvider>(
    entry: &WalEntry,
    schema: &S,
    memtable: &mut MemTable,
    index: &mut TimeRangeIndex,
    mods: &mut ModificationLog,
    data_file_size: u64,
) -> RecoveryResult<()> {
    match &entry.operation {
        Operation::InsertRow {
            device,
            timestamp,
            values,
        } => {
            for (measurement, value) in values {
                match schema.data_type(device, measurement) {
                    None => {
                        return Err(RecoveryError::replay_failed(format!(
                            "insert references unknown series {}.{}",
                            device, measurement
                        )))
                    }
                    Some(expected) if expected != value.data_type() => {
                        return Err(RecoveryError::replay_failed(format!(
                            "insert into {}.{} carries {} but the series is {}",
                            device,
                            measurement,
                            value.data_type().type_name(),
                            expected.type_name()
                        )))
                    }
                    Some(_) => {}
                }
            }

            memtable.insert_row(device, *timestamp, values);
            index.update(device, *timestamp);
        }
        Operation::DeleteRange {
            path,
            start_time,
            end_time,
        } => {
            let deletion = Deletion::new(path.clone(), data_file_size, *start_time, *end_time)
                .map_err(|e| RecoveryError::replay_failed(e.to_string()))?;
            mods.append(&deletion).map_err(|e| {
                RecoveryError::replay_failed(format!("failed to log redone delete: {}", e))
            })?;
            memtable.delete_range(path, *start_time, *end_time);
        }
    }
    Ok(())
}
