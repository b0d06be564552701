//! WAL segment reader
//!
//! Strict, in-order reads: every entry's frame and checksum are validated
//! and any failure is fatal corruption. Replay must never skip an entry,
//! since a skipped entry would silently under-apply mutations, so the
//! reader offers no resynchronization.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use super::entry::WalEntry;
use super::errors::{WalError, WalResult};
use super::writer::segment_path;

/// Sequential reader over one WAL segment.
pub struct WalReader {
    /// Path to the segment file
    path: PathBuf,
    /// Buffered reader
    reader: BufReader<File>,
    /// Current byte offset
    current_offset: u64,
    /// Total segment size
    file_size: u64,
}

impl WalReader {
    /// Opens a segment file for reading.
    pub fn open(path: &Path) -> WalResult<Self> {
        let file = File::open(path).map_err(|e| {
            WalError::read_failed(format!("failed to open segment {}", path.display()), e)
        })?;
        let file_size = file
            .metadata()
            .map_err(|e| WalError::read_failed("failed to read segment metadata", e))?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            current_offset: 0,
            file_size,
        })
    }

    /// Opens the segment of a table, or `None` when the table never logged
    /// anything.
    pub fn open_segment(wal_dir: &Path, table_id: u64) -> WalResult<Option<Self>> {
        let path = segment_path(wal_dir, table_id);
        if !path.exists() {
            return Ok(None);
        }
        Self::open(&path).map(Some)
    }

    /// Returns the segment path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current byte offset.
    pub fn current_offset(&self) -> u64 {
        self.current_offset
    }

    /// Reads the next entry.
    ///
    /// - `Ok(Some(entry))` on a valid entry
    /// - `Ok(None)` at end of segment
    /// - `Err(CHRONO_WAL_CORRUPTION)` on any framing or checksum failure
    pub fn read_next(&mut self) -> WalResult<Option<WalEntry>> {
        if self.current_offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.current_offset;
        // length + table id + op tag + checksum
        const MIN_RECORD_SIZE: u64 = 4 + 8 + 1 + 4;

        if remaining < MIN_RECORD_SIZE {
            return Err(WalError::corruption(
                self.current_offset,
                format!(
                    "truncated segment: {} bytes remaining, minimum record size is {}",
                    remaining, MIN_RECORD_SIZE
                ),
            ));
        }

        let mut len_buf = [0u8; 4];
        self.reader.read_exact(&mut len_buf).map_err(|e| {
            WalError::corruption(
                self.current_offset,
                format!("failed to read record length: {}", e),
            )
        })?;
        let record_length = u32::from_le_bytes(len_buf) as u64;

        if record_length < MIN_RECORD_SIZE {
            return Err(WalError::corruption(
                self.current_offset,
                format!("invalid record length: {}", record_length),
            ));
        }
        if record_length > remaining {
            return Err(WalError::corruption(
                self.current_offset,
                format!(
                    "record length {} exceeds remaining segment size {}",
                    record_length, remaining
                ),
            ));
        }

        let mut record_buf = vec![0u8; record_length as usize];
        record_buf[..4].copy_from_slice(&len_buf);
        self.reader.read_exact(&mut record_buf[4..]).map_err(|e| {
            WalError::corruption(
                self.current_offset,
                format!("failed to read record body: {}", e),
            )
        })?;

        let (entry, consumed) = WalEntry::deserialize(&record_buf)
            .map_err(|e| WalError::corruption(self.current_offset, e.to_string()))?;

        self.current_offset += consumed as u64;
        Ok(Some(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::super::writer::WalWriter;
    use super::*;
    use crate::schema::FieldValue;
    use crate::series::SeriesPath;
    use std::fs;
    use tempfile::TempDir;

    fn write_entries(wal_dir: &Path, table_id: u64, count: u64) -> PathBuf {
        let mut writer = WalWriter::open(wal_dir, table_id).unwrap();
        for i in 0..count {
            let entry = WalEntry::insert_row(
                table_id,
                "root.sg.d1",
                i as i64,
                vec![("s1".to_string(), FieldValue::Int32(i as i32))],
            );
            writer.append(&entry).unwrap();
        }
        writer.path().to_path_buf()
    }

    #[test]
    fn test_read_in_append_order() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_entries(&temp_dir.path().join("wal"), 1, 3);

        let mut reader = WalReader::open(&path).unwrap();
        for expected in 0..3i64 {
            let entry = reader.read_next().unwrap().unwrap();
            match entry.operation {
                crate::wal::Operation::InsertRow { timestamp, .. } => {
                    assert_eq!(timestamp, expected)
                }
                _ => panic!("expected insert"),
            }
        }
        assert!(reader.read_next().unwrap().is_none());
    }

    #[test]
    fn test_missing_segment_is_none() {
        let temp_dir = TempDir::new().unwrap();
        assert!(WalReader::open_segment(&temp_dir.path().join("wal"), 5)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_existing_segment_is_some() {
        let temp_dir = TempDir::new().unwrap();
        let wal_dir = temp_dir.path().join("wal");
        write_entries(&wal_dir, 5, 1);
        assert!(WalReader::open_segment(&wal_dir, 5).unwrap().is_some());
    }

    #[test]
    fn test_corrupt_entry_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_entries(&temp_dir.path().join("wal"), 1, 2);

        let mut contents = fs::read(&path).unwrap();
        let mid = contents.len() / 2;
        contents[mid] ^= 0xFF;
        fs::write(&path, contents).unwrap();

        let mut reader = WalReader::open(&path).unwrap();
        let mut saw_error = false;
        loop {
            match reader.read_next() {
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(e) => {
                    assert!(e.is_fatal());
                    saw_error = true;
                    break;
                }
            }
        }
        assert!(saw_error);
    }

    #[test]
    fn test_truncated_tail_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let wal_dir = temp_dir.path().join("wal");
        let mut writer = WalWriter::open(&wal_dir, 2).unwrap();
        writer
            .append(&WalEntry::delete_range(
                2,
                SeriesPath::new("root.sg.d1").unwrap(),
                i64::MIN,
                i64::MAX,
            ))
            .unwrap();
        let path = writer.path().to_path_buf();
        drop(writer);

        let contents = fs::read(&path).unwrap();
        fs::write(&path, &contents[..contents.len() - 6]).unwrap();

        let mut reader = WalReader::open(&path).unwrap();
        assert!(reader.read_next().is_err());
    }
}
