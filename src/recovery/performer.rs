//! Unsealed file recovery
//!
//! One performer recovers one unsealed data file after a restart. Its
//! phases run strictly in order, each trusting only the previous phase's
//! durable output:
//!
//! 1. Crash check - scan the file's structurally valid prefix. A file that
//!    ends exactly at the prefix did not crash: if its sidecar exists and
//!    is closed the file is already sealed and nothing happens; otherwise
//!    only the replay phases run. A file with bytes past the prefix
//!    crashed mid-flush.
//! 2. Truncate - cut the file back to the prefix boundary and fsync. The
//!    only step that shrinks the file; everything after it reads the
//!    truncated file as ground truth.
//! 3. Rebuild index - re-scan the truncated file and rebuild the
//!    time-range index from its chunks alone. Prior index state is
//!    discarded, never merged: it may describe truncated-away bytes.
//! 4. Replay WAL - redo the table's logged operations in order. The
//!    discarded region is not partially trusted; the WAL is the sole
//!    authority for everything at or past the crash boundary.
//! 5. Finalize - flush rows the replay produced into the file, refresh the
//!    sidecar, and mark the file writable. Recovery does not seal: the
//!    file stays open for live appends.
//! 6. Done - hand the performer to the status callback, exactly once.
//!
//! `recover` consumes the performer, so a pass cannot be re-entered or
//! resumed; a failure in any phase aborts the whole pass and surfaces to
//! the caller with no partial-success state. File handles are scoped to
//! the phases that need them and released on every exit path.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::memtable::MemTable;
use crate::modification::ModificationLog;
use crate::observability::Logger;
use crate::resource::TimeRangeIndex;
use crate::schema::SchemaProvider;
use crate::tsfile::{TsFileReader, TsFileWriter};

use super::errors::{RecoveryError, RecoveryResult};
use super::redo::{redo_wal_entry, WalRead};

/// Recovers one unsealed data file.
pub struct RecoverPerformer {
    /// Path of the data file under recovery
    tsfile_path: PathBuf,
    /// Whether the file belongs to the sequence space of its series group
    sequential: bool,
    /// The file's time-range index, rebuilt during the pass
    resource: TimeRangeIndex,
    /// In-memory table collecting redone inserts
    memtable: MemTable,
    /// The file's modification log, extended by redone deletes
    mods: ModificationLog,
    /// Whether the crash check found bytes past the valid prefix
    has_crashed: bool,
    /// Whether the file may take new appends after the pass
    can_write: bool,
}

impl RecoverPerformer {
    /// Binds a performer to an unsealed data file and the in-memory table
    /// identified by `table_id`.
    pub fn new(tsfile_path: &Path, sequential: bool, table_id: u64) -> Self {
        Self {
            tsfile_path: tsfile_path.to_path_buf(),
            sequential,
            resource: TimeRangeIndex::new(tsfile_path),
            memtable: MemTable::new(table_id),
            mods: ModificationLog::new(tsfile_path),
            has_crashed: false,
            can_write: false,
        }
    }

    /// Path of the data file under recovery.
    pub fn tsfile_path(&self) -> &Path {
        &self.tsfile_path
    }

    /// Whether the file belongs to the sequence space.
    pub fn sequential(&self) -> bool {
        self.sequential
    }

    /// Whether the crash check found a torn tail. Meaningful once
    /// `recover` has returned.
    pub fn has_crashed(&self) -> bool {
        self.has_crashed
    }

    /// Whether the file may take new appends.
    pub fn can_write(&self) -> bool {
        self.can_write
    }

    /// The file's time-range index.
    pub fn resource(&self) -> &TimeRangeIndex {
        &self.resource
    }

    /// Consumes the performer, yielding the rebuilt index.
    pub fn into_resource(self) -> TimeRangeIndex {
        self.resource
    }

    /// Runs the full recovery pass.
    ///
    /// `wal` is the segment of this file's in-memory table; entries of
    /// other tables are skipped. `on_file_status_decided` fires exactly
    /// once, after the file's fate is settled; the coordinator uses it to
    /// pick the single writable tail among a series' recovered files.
    ///
    /// Consumes the performer and returns it for inspection. Any phase
    /// failure aborts the pass; no callback fires and no partial state is
    /// presented as recovered.
    pub fn recover<S, W, F>(
        mut self,
        schema: &S,
        wal: &mut W,
        on_file_status_decided: F,
    ) -> RecoveryResult<Self>
    where
        S: SchemaProvider,
        W: WalRead,
        F: FnOnce(&Self),
    {
        // Phase 1: crash check. The reader is scoped so its handle is gone
        // before truncation.
        let (file_size, valid_size) = {
            let mut reader = TsFileReader::open(&self.tsfile_path)
                .map_err(|e| RecoveryError::corrupt_file(e.to_string()))?;
            let prefix = reader
                .scan_valid_prefix()
                .map_err(|e| RecoveryError::corrupt_file(e.to_string()))?;
            (reader.file_size(), prefix.valid_size)
        };
        self.has_crashed = file_size > valid_size;

        if !self.has_crashed {
            if self.resource.resource_exists() {
                match TimeRangeIndex::load(&self.tsfile_path) {
                    Ok(loaded) if loaded.is_closed() => {
                        // Sealed file: nothing to recover, never writable.
                        self.resource = loaded;
                        self.can_write = false;
                        on_file_status_decided(&self);
                        return Ok(self);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        // A partial sidecar carries no authority; the index
                        // is rebuilt from the file below.
                        Logger::warn(
                            "RECOVERY_SIDECAR_IGNORED",
                            &[
                                ("file", &self.tsfile_path.display().to_string()),
                                ("reason", e.message()),
                            ],
                        );
                    }
                }
            }
        } else {
            // Phase 2: truncate to the last valid boundary and make the
            // shrink durable before anything reads the file again.
            let file = OpenOptions::new()
                .write(true)
                .open(&self.tsfile_path)
                .map_err(|e| {
                    RecoveryError::truncation_failed(format!(
                        "failed to open {} for truncation: {}",
                        self.tsfile_path.display(),
                        e
                    ))
                })?;
            file.set_len(valid_size).map_err(|e| {
                RecoveryError::truncation_failed(format!(
                    "failed to truncate {} to {}: {}",
                    self.tsfile_path.display(),
                    valid_size,
                    e
                ))
            })?;
            file.sync_all().map_err(|e| {
                RecoveryError::truncation_failed(format!("fsync failed after truncation: {}", e))
            })?;

            Logger::warn(
                "RECOVERY_FILE_TRUNCATED",
                &[
                    ("file", &self.tsfile_path.display().to_string()),
                    ("from_bytes", &file_size.to_string()),
                    ("to_bytes", &valid_size.to_string()),
                ],
            );
        }

        // Phase 3: rebuild the index from the truncated file exclusively.
        // The re-scan is strict: the file now ends at a group boundary or
        // something is deeply wrong.
        let chunk_metadata = {
            let mut reader = TsFileReader::open(&self.tsfile_path)
                .map_err(|e| RecoveryError::corrupt_file(e.to_string()))?;
            reader
                .all_chunk_metadata()
                .map_err(|e| RecoveryError::corrupt_file(e.to_string()))?
        };
        self.resource.clear();
        for metadata in &chunk_metadata {
            self.resource.update(&metadata.device, metadata.start_time);
            self.resource.update(&metadata.device, metadata.end_time);
        }

        // Phase 4: replay. Deletion records are stamped with the file's
        // size as of now; replayed inserts stay in memory until finalize,
        // so the size is stable across the whole phase.
        let data_file_size = fs::metadata(&self.tsfile_path)
            .map_err(|e| {
                RecoveryError::recovery_failed(format!("failed to stat data file: {}", e))
            })?
            .len();

        let mut replayed = 0u64;
        while let Some(entry) = wal.read_next()? {
            if entry.table_id != self.memtable.table_id() {
                continue;
            }
            redo_wal_entry(
                &entry,
                schema,
                &mut self.memtable,
                &mut self.resource,
                &mut self.mods,
                data_file_size,
            )?;
            replayed += 1;
        }

        // Phase 5: finalize. Flush replayed rows, refresh the sidecar,
        // reopen for business.
        if !self.memtable.is_empty() {
            let mut writer = TsFileWriter::append_to(&self.tsfile_path)
                .map_err(|e| RecoveryError::recovery_failed(e.to_string()))?;
            self.memtable
                .drain_into(&mut writer)
                .map_err(|e| RecoveryError::recovery_failed(e.to_string()))?;
            writer
                .flush_chunk_groups()
                .map_err(|e| RecoveryError::recovery_failed(e.to_string()))?;
        }
        self.resource
            .persist()
            .map_err(|e| RecoveryError::recovery_failed(e.to_string()))?;
        self.can_write = true;

        // Phase 6: done.
        Logger::info(
            "RECOVERY_FILE_COMPLETE",
            &[
                ("file", &self.tsfile_path.display().to_string()),
                ("crashed", if self.has_crashed { "true" } else { "false" }),
                ("replayed_entries", &replayed.to_string()),
            ],
        );
        on_file_status_decided(&self);
        Ok(self)
    }
}
