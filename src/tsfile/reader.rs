//! Data file reader
//!
//! Two reading modes with one scanning core:
//!
//! - strict reads (`read_groups`, `chunk_metadata_list`, `read_points`)
//!   treat any framing or checksum failure as fatal corruption; they serve
//!   queries against files recovery has already blessed.
//! - `scan_valid_prefix` is the recovery entry point: it walks groups from
//!   the header and stops at the first one that fails to frame, reporting
//!   how many bytes of the file are structurally trustworthy. Only a bad
//!   header is an error here; a torn tail is an answer, not a failure.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::schema::FieldValue;

use super::chunk::{ChunkGroup, ChunkMetadata, FORMAT_VERSION, HEADER_LEN, MAGIC};
use super::errors::{TsFileError, TsFileResult};

/// The structurally valid prefix of a data file.
#[derive(Debug, Clone)]
pub struct ValidPrefix {
    /// Byte length of the valid prefix
    pub valid_size: u64,
    /// Metadata of every chunk inside the prefix, in file order
    pub chunk_metadata: Vec<ChunkMetadata>,
}

/// Reader over one data file.
pub struct TsFileReader {
    /// Path to the data file
    path: PathBuf,
    /// Buffered reader
    reader: BufReader<File>,
    /// Total file size
    file_size: u64,
}

impl TsFileReader {
    /// Opens the data file for reading.
    pub fn open(path: &Path) -> TsFileResult<Self> {
        let file = File::open(path).map_err(|e| {
            TsFileError::read_failed(format!("failed to open {}", path.display()), e)
        })?;
        let file_size = file
            .metadata()
            .map_err(|e| TsFileError::read_failed("failed to read file metadata", e))?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            file_size,
        })
    }

    /// Returns the data file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the total file size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Validates the file header.
    ///
    /// The caller has already ruled out files shorter than the header.
    fn check_header(&mut self) -> TsFileResult<()> {
        self.seek_to(0)?;
        let mut header = [0u8; HEADER_LEN as usize];
        self.reader
            .read_exact(&mut header)
            .map_err(|e| TsFileError::read_failed("failed to read file header", e))?;

        if &header[..4] != MAGIC {
            return Err(TsFileError::corruption("bad magic bytes in file header"));
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != FORMAT_VERSION {
            return Err(TsFileError::corruption(format!(
                "unsupported format version {}",
                version
            )));
        }
        Ok(())
    }

    fn seek_to(&mut self, offset: u64) -> TsFileResult<()> {
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| TsFileError::read_failed(format!("failed to seek to {}", offset), e))?;
        Ok(())
    }

    /// Reads the framed group starting at `offset`.
    ///
    /// Returns the group and the number of bytes consumed. Framing problems
    /// surface as `io::Error`; the caller decides whether that means
    /// corruption or the end of the valid prefix.
    fn read_group_frame(&mut self, offset: u64) -> std::io::Result<(ChunkGroup, u64)> {
        use std::io::{Error, ErrorKind};

        let remaining = self.file_size - offset;
        if remaining < 4 {
            return Err(Error::new(
                ErrorKind::UnexpectedEof,
                "partial group length field",
            ));
        }

        let mut len_buf = [0u8; 4];
        self.reader.read_exact(&mut len_buf)?;
        let group_length = u32::from_le_bytes(len_buf) as u64;

        if group_length < 4 || group_length > remaining {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!("group length {} does not fit in file", group_length),
            ));
        }

        let mut frame = vec![0u8; group_length as usize];
        frame[..4].copy_from_slice(&len_buf);
        self.reader.read_exact(&mut frame[4..])?;

        let (group, consumed) = ChunkGroup::deserialize(&frame)?;
        Ok((group, consumed as u64))
    }

    /// Scans the structurally valid prefix of the file.
    ///
    /// - a zero-length file is a valid, empty prefix;
    /// - a file shorter than the header is a torn header write: valid
    ///   prefix is empty;
    /// - a complete header with wrong magic or version is fatal corruption;
    /// - the prefix then extends group by group until the first frame that
    ///   fails to parse or verify.
    pub fn scan_valid_prefix(&mut self) -> TsFileResult<ValidPrefix> {
        if self.file_size < HEADER_LEN {
            return Ok(ValidPrefix {
                valid_size: 0,
                chunk_metadata: Vec::new(),
            });
        }

        self.check_header()?;

        let mut offset = HEADER_LEN;
        let mut chunk_metadata = Vec::new();

        while offset < self.file_size {
            match self.read_group_frame(offset) {
                Ok((group, consumed)) => {
                    chunk_metadata.extend(group.metadata(offset));
                    offset += consumed;
                }
                Err(_) => break,
            }
        }

        Ok(ValidPrefix {
            valid_size: offset,
            chunk_metadata,
        })
    }

    /// Reads every group in the file, strictly.
    ///
    /// Returns `(frame_offset, group)` pairs in file order. Any framing or
    /// checksum failure is fatal corruption.
    pub fn read_groups(&mut self) -> TsFileResult<Vec<(u64, ChunkGroup)>> {
        if self.file_size == 0 {
            return Ok(Vec::new());
        }
        if self.file_size < HEADER_LEN {
            return Err(TsFileError::corruption_at_offset(
                0,
                "file shorter than header",
            ));
        }

        self.check_header()?;

        let mut offset = HEADER_LEN;
        let mut groups = Vec::new();
        while offset < self.file_size {
            let (group, consumed) = self
                .read_group_frame(offset)
                .map_err(|e| TsFileError::corruption_at_offset(offset, e.to_string()))?;
            groups.push((offset, group));
            offset += consumed;
        }
        Ok(groups)
    }

    /// Metadata of every chunk in the file, in file order.
    pub fn all_chunk_metadata(&mut self) -> TsFileResult<Vec<ChunkMetadata>> {
        Ok(self
            .read_groups()?
            .into_iter()
            .flat_map(|(offset, group)| group.metadata(offset))
            .collect())
    }

    /// Metadata of every chunk of one series, in file order.
    pub fn chunk_metadata_list(
        &mut self,
        device: &str,
        measurement: &str,
    ) -> TsFileResult<Vec<ChunkMetadata>> {
        Ok(self
            .all_chunk_metadata()?
            .into_iter()
            .filter(|m| m.device == device && m.measurement == measurement)
            .collect())
    }

    /// Reads the points of the chunk described by `metadata`.
    pub fn read_points(&mut self, metadata: &ChunkMetadata) -> TsFileResult<Vec<(i64, FieldValue)>> {
        self.seek_to(metadata.group_offset)?;
        let (group, _) = self
            .read_group_frame(metadata.group_offset)
            .map_err(|e| TsFileError::corruption_at_offset(metadata.group_offset, e.to_string()))?;

        group
            .chunks
            .into_iter()
            .find(|chunk| chunk.measurement == metadata.measurement)
            .map(|chunk| chunk.points)
            .ok_or_else(|| {
                TsFileError::corruption_at_offset(
                    metadata.group_offset,
                    format!(
                        "group for {} holds no chunk named {}",
                        metadata.device, metadata.measurement
                    ),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::super::chunk::HEADER_LEN;
    use super::super::writer::TsFileWriter;
    use super::*;
    use crate::schema::FieldValue;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_sample(path: &Path) -> u64 {
        let mut writer = TsFileWriter::create(path).unwrap();
        writer
            .write_value("root.sg.d1", "s1", 1, FieldValue::Int32(1))
            .unwrap();
        writer
            .write_value("root.sg.d2", "s1", 3, FieldValue::Float(3.0))
            .unwrap();
        writer.flush_chunk_groups().unwrap();
        writer.file_size()
    }

    #[test]
    fn test_scan_zero_length_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("0.tsd");
        std::fs::write(&path, b"").unwrap();

        let mut reader = TsFileReader::open(&path).unwrap();
        let prefix = reader.scan_valid_prefix().unwrap();
        assert_eq!(prefix.valid_size, 0);
        assert!(prefix.chunk_metadata.is_empty());
    }

    #[test]
    fn test_scan_partial_header() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("0.tsd");
        std::fs::write(&path, b"CHR").unwrap();

        let mut reader = TsFileReader::open(&path).unwrap();
        let prefix = reader.scan_valid_prefix().unwrap();
        assert_eq!(prefix.valid_size, 0);
    }

    #[test]
    fn test_bad_magic_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("0.tsd");
        std::fs::write(&path, b"NOPE\x01\x00trailing").unwrap();

        let mut reader = TsFileReader::open(&path).unwrap();
        let err = reader.scan_valid_prefix().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_scan_complete_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("0.tsd");
        let size = write_sample(&path);

        let mut reader = TsFileReader::open(&path).unwrap();
        let prefix = reader.scan_valid_prefix().unwrap();
        assert_eq!(prefix.valid_size, size);
        assert_eq!(prefix.chunk_metadata.len(), 2);
    }

    #[test]
    fn test_scan_stops_at_torn_tail() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("0.tsd");
        let size = write_sample(&path);

        // Append half a frame.
        {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&path)
                .unwrap();
            file.write_all(&[0x40, 0x00, 0x00, 0x00, 0xAA, 0xBB]).unwrap();
        }

        let mut reader = TsFileReader::open(&path).unwrap();
        let prefix = reader.scan_valid_prefix().unwrap();
        assert_eq!(prefix.valid_size, size);
        assert_eq!(prefix.chunk_metadata.len(), 2);
    }

    #[test]
    fn test_strict_read_rejects_torn_tail() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("0.tsd");
        write_sample(&path);
        {
            let mut file = std::fs::OpenOptions::new()
                .append(true)
                .open(&path)
                .unwrap();
            file.write_all(&[0x01, 0x02]).unwrap();
        }

        let mut reader = TsFileReader::open(&path).unwrap();
        let err = reader.read_groups().unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_header_only_file_is_valid_and_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("0.tsd");
        let _ = TsFileWriter::create(&path).unwrap();

        let mut reader = TsFileReader::open(&path).unwrap();
        let prefix = reader.scan_valid_prefix().unwrap();
        assert_eq!(prefix.valid_size, HEADER_LEN);
        assert!(prefix.chunk_metadata.is_empty());
        assert!(reader.read_groups().unwrap().is_empty());
    }

    #[test]
    fn test_read_points_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("0.tsd");
        write_sample(&path);

        let mut reader = TsFileReader::open(&path).unwrap();
        let metadata = reader.chunk_metadata_list("root.sg.d2", "s1").unwrap();
        assert_eq!(metadata.len(), 1);

        let points = reader.read_points(&metadata[0]).unwrap();
        assert_eq!(points, vec![(3, FieldValue::Float(3.0))]);
    }
}
