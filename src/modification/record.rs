//! Deletion records
//!
//! A deletion is an immutable fact: every point of `path` with a timestamp
//! in `[start_time, end_time]` is logically deleted. `file_offset` records
//! how large the owning data file was when the deletion was created, which
//! partitions the file into bytes the deletion provably covers and bytes
//! written later. The offset is a versioning token carried in memory and by
//! the log's bookkeeping; it is deliberately absent from the serialized
//! payload, so a record round-trips `{start_time, end_time, path}` exactly
//! and nothing else.

use std::io::{self, Cursor, Read};

use crate::series::SeriesPath;
use crate::tsfile::compute_checksum;

use super::errors::{ModificationError, ModificationResult};

/// A delete-range fact against one series path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Deletion {
    /// The covered path (device or full series)
    path: SeriesPath,
    /// Size of the owning data file when this deletion was created
    file_offset: u64,
    /// Interval start, `i64::MIN` for an open-ended low bound
    start_time: i64,
    /// Interval end
    end_time: i64,
}

impl Deletion {
    /// Creates a deletion covering `[start_time, end_time]`.
    ///
    /// # Errors
    ///
    /// `InvalidRange` when `start_time > end_time`.
    pub fn new(
        path: SeriesPath,
        file_offset: u64,
        start_time: i64,
        end_time: i64,
    ) -> ModificationResult<Self> {
        if start_time > end_time {
            return Err(ModificationError::InvalidRange {
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self {
            path,
            file_offset,
            start_time,
            end_time,
        })
    }

    /// Creates a deletion with an open-ended low bound.
    pub fn open_start(path: SeriesPath, file_offset: u64, end_time: i64) -> Self {
        Self {
            path,
            file_offset,
            start_time: i64::MIN,
            end_time,
        }
    }

    /// The covered path.
    pub fn path(&self) -> &SeriesPath {
        &self.path
    }

    /// The owning data file's size when the deletion was created.
    pub fn file_offset(&self) -> u64 {
        self.file_offset
    }

    /// Interval start.
    pub fn start_time(&self) -> i64 {
        self.start_time
    }

    /// Interval end.
    pub fn end_time(&self) -> i64 {
        self.end_time
    }

    /// Whether the deletion covers `timestamp` on `device`.`measurement`.
    pub fn covers(&self, device: &str, measurement: &str, timestamp: i64) -> bool {
        self.path.covers(device, measurement)
            && timestamp >= self.start_time
            && timestamp <= self.end_time
    }

    /// Serializes the framed log record.
    ///
    /// Frame: Record Length (u32 LE, total including itself), Start Time
    /// (i64 LE), End Time (i64 LE), Path (u32-length-prefixed UTF-8),
    /// Checksum (u32 LE over length field + body). The file offset is not
    /// part of the payload.
    pub fn serialize(&self) -> Vec<u8> {
        let path_bytes = self.path.as_str().as_bytes();
        let body_len = 8 + 8 + 4 + path_bytes.len();
        let record_length = (4 + body_len + 4) as u32;

        let mut record = Vec::with_capacity(record_length as usize);
        record.extend_from_slice(&record_length.to_le_bytes());
        record.extend_from_slice(&self.start_time.to_le_bytes());
        record.extend_from_slice(&self.end_time.to_le_bytes());
        record.extend_from_slice(&(path_bytes.len() as u32).to_le_bytes());
        record.extend_from_slice(path_bytes);

        let checksum = compute_checksum(&record);
        record.extend_from_slice(&checksum.to_le_bytes());
        record
    }

    /// Deserializes a framed log record, verifying the checksum.
    ///
    /// The payload carries no file offset, so the restored record's offset
    /// is zero; callers that need the original offset must track it beside
    /// the log. Returns the record and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> ModificationResult<(Self, usize)> {
        // length + start + end + path length + checksum
        const MIN_RECORD_SIZE: usize = 4 + 8 + 8 + 4 + 4;

        let framing = |reason: String| ModificationError::Corrupt { offset: 0, reason };

        if data.len() < MIN_RECORD_SIZE {
            return Err(framing("record too short".to_string()));
        }

        let record_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if record_length < MIN_RECORD_SIZE {
            return Err(framing(format!("invalid record length: {}", record_length)));
        }
        if data.len() < record_length {
            return Err(framing(format!(
                "record truncated: expected {} bytes, got {}",
                record_length,
                data.len()
            )));
        }

        let checksum_offset = record_length - 4;
        let stored_checksum = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        let computed_checksum = compute_checksum(&data[..checksum_offset]);
        if computed_checksum != stored_checksum {
            return Err(framing(format!(
                "checksum mismatch: computed {:08x}, stored {:08x}",
                computed_checksum, stored_checksum
            )));
        }

        let mut cursor = Cursor::new(&data[4..checksum_offset]);
        let start_time = read_i64(&mut cursor).map_err(|e| framing(e.to_string()))?;
        let end_time = read_i64(&mut cursor).map_err(|e| framing(e.to_string()))?;
        let path_string = read_string(&mut cursor).map_err(|e| framing(e.to_string()))?;
        let path = SeriesPath::new(path_string)?;

        let deletion = Deletion::new(path, 0, start_time, end_time)?;
        Ok((deletion, record_length))
    }
}

fn read_i64<R: Read>(reader: &mut R) -> io::Result<i64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

fn read_string<R: Read>(reader: &mut R) -> io::Result<String> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("invalid UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> SeriesPath {
        SeriesPath::new(s).unwrap()
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = Deletion::new(path("root.sg.d1"), 0, 10, 5).unwrap_err();
        assert!(matches!(err, ModificationError::InvalidRange { .. }));
    }

    #[test]
    fn test_open_start_uses_minimum_timestamp() {
        let deletion = Deletion::open_start(path("root.sg.d1"), 0, 100);
        assert_eq!(deletion.start_time(), i64::MIN);
        assert_eq!(deletion.end_time(), 100);
    }

    #[test]
    fn test_roundtrip_excludes_file_offset() {
        let deletion = Deletion::new(path("root.sg.d2.s1"), 4096, 3, 17).unwrap();
        let serialized = deletion.serialize();
        let (restored, consumed) = Deletion::deserialize(&serialized).unwrap();

        assert_eq!(consumed, serialized.len());
        assert_eq!(restored.start_time(), 3);
        assert_eq!(restored.end_time(), 17);
        assert_eq!(restored.path(), deletion.path());
        // The offset is not part of the payload.
        assert_eq!(restored.file_offset(), 0);
    }

    #[test]
    fn test_serialized_form_identical_for_different_offsets() {
        let a = Deletion::new(path("root.sg.d1"), 10, 1, 2).unwrap();
        let b = Deletion::new(path("root.sg.d1"), 99999, 1, 2).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.serialize(), b.serialize());
    }

    #[test]
    fn test_structural_equality_and_hash() {
        use std::collections::HashSet;

        let a = Deletion::new(path("root.sg.d1"), 10, 1, 2).unwrap();
        let b = Deletion::new(path("root.sg.d1"), 10, 1, 2).unwrap();
        let c = Deletion::new(path("root.sg.d1"), 11, 1, 2).unwrap();

        assert_eq!(a, b);
        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        set.insert(c);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_covers() {
        let deletion = Deletion::new(path("root.sg.d2"), 0, 3, 10).unwrap();
        assert!(deletion.covers("root.sg.d2", "s1", 3));
        assert!(deletion.covers("root.sg.d2", "s2", 10));
        assert!(!deletion.covers("root.sg.d2", "s1", 2));
        assert!(!deletion.covers("root.sg.d1", "s1", 5));
    }

    #[test]
    fn test_corrupt_record_detected() {
        let deletion = Deletion::new(path("root.sg.d1"), 0, 1, 2).unwrap();
        let mut serialized = deletion.serialize();
        let mid = serialized.len() / 2;
        serialized[mid] ^= 0xFF;

        assert!(Deletion::deserialize(&serialized).is_err());
    }
}
