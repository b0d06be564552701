//! WAL segment writer
//!
//! One segment per in-memory table, named `<table_id>.wal`. Every append
//! is followed by an fsync: an operation is durable exactly when its entry
//! is, and recovery replays nothing that was not.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::entry::WalEntry;
use super::errors::{WalError, WalResult};

/// Path of the segment belonging to an in-memory table.
pub fn segment_path(wal_dir: &Path, table_id: u64) -> PathBuf {
    wal_dir.join(format!("{}.wal", table_id))
}

/// Append-only writer for one WAL segment.
pub struct WalWriter {
    /// Path to the segment file
    path: PathBuf,
    /// Underlying file handle
    file: File,
    /// Current file offset
    current_offset: u64,
}

impl WalWriter {
    /// Opens (or creates) the segment for a table, creating the WAL
    /// directory if needed.
    pub fn open(wal_dir: &Path, table_id: u64) -> WalResult<Self> {
        fs::create_dir_all(wal_dir).map_err(|e| {
            WalError::append_failed(
                format!("failed to create WAL directory {}", wal_dir.display()),
                e,
            )
        })?;

        let path = segment_path(wal_dir, table_id);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                WalError::append_failed(format!("failed to open segment {}", path.display()), e)
            })?;

        let current_offset = file
            .metadata()
            .map_err(|e| WalError::append_failed("failed to read segment metadata", e))?
            .len();

        Ok(Self {
            path,
            file,
            current_offset,
        })
    }

    /// Returns the segment path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current segment size in bytes.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Appends an entry and fsyncs.
    ///
    /// Returns the byte offset the entry was written at.
    pub fn append(&mut self, entry: &WalEntry) -> WalResult<u64> {
        let serialized = entry.serialize();
        let offset = self.current_offset;

        self.file
            .write_all(&serialized)
            .map_err(|e| WalError::append_failed("failed to append WAL entry", e))?;
        self.file
            .sync_all()
            .map_err(|e| WalError::fsync_failed("fsync failed after WAL append", e))?;

        self.current_offset += serialized.len() as u64;
        Ok(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::super::reader::WalReader;
    use super::*;
    use crate::schema::FieldValue;
    use tempfile::TempDir;

    #[test]
    fn test_append_and_read_back() {
        let temp_dir = TempDir::new().unwrap();
        let wal_dir = temp_dir.path().join("wal");

        let entry = WalEntry::insert_row(
            7,
            "root.sg.d1",
            1,
            vec![("s1".to_string(), FieldValue::Int32(1))],
        );

        {
            let mut writer = WalWriter::open(&wal_dir, 7).unwrap();
            assert_eq!(writer.append(&entry).unwrap(), 0);
            assert!(writer.current_offset() > 0);
        }

        let mut reader = WalReader::open(&segment_path(&wal_dir, 7)).unwrap();
        let read = reader.read_next().unwrap().unwrap();
        assert_eq!(read, entry);
        assert!(reader.read_next().unwrap().is_none());
    }

    #[test]
    fn test_reopen_appends_after_existing_entries() {
        let temp_dir = TempDir::new().unwrap();
        let wal_dir = temp_dir.path().join("wal");

        let entry = WalEntry::insert_row(3, "root.sg.d1", 1, vec![]);
        {
            let mut writer = WalWriter::open(&wal_dir, 3).unwrap();
            writer.append(&entry).unwrap();
        }
        {
            let mut writer = WalWriter::open(&wal_dir, 3).unwrap();
            assert!(writer.current_offset() > 0);
            writer.append(&entry).unwrap();
        }

        let mut reader = WalReader::open(&segment_path(&wal_dir, 3)).unwrap();
        let mut count = 0;
        while reader.read_next().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 2);
    }
}
