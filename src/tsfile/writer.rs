//! Data file writer
//!
//! The writer buffers points per device and measurement and turns the
//! buffer into framed chunk groups on flush, one group per device, with an
//! fsync once the groups of a flush are on disk. Nothing reaches the file
//! until `flush_chunk_groups`; a crash between flushes loses only buffered
//! points that were never acknowledged as durable.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::schema::{DataType, FieldValue};

use super::chunk::{file_header, ChunkData, ChunkGroup};
use super::errors::{TsFileError, TsFileResult};

type SeriesBuffer = BTreeMap<i64, FieldValue>;
type DeviceBuffer = BTreeMap<String, (DataType, SeriesBuffer)>;

/// Append-only writer for one data file.
pub struct TsFileWriter {
    /// Path to the data file
    path: PathBuf,
    /// Underlying file handle
    file: File,
    /// Current file size in bytes
    file_size: u64,
    /// Buffered points: device -> measurement -> time -> value
    buffered: BTreeMap<String, DeviceBuffer>,
    /// Total buffered points across all series
    buffered_points: usize,
}

impl TsFileWriter {
    /// Creates a new data file, truncating any existing one, and writes the
    /// file header.
    pub fn create(path: &Path) -> TsFileResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|e| {
                TsFileError::write_failed(format!("failed to create {}", path.display()), e)
            })?;

        let mut writer = Self {
            path: path.to_path_buf(),
            file,
            file_size: 0,
            buffered: BTreeMap::new(),
            buffered_points: 0,
        };
        writer.write_header()?;
        Ok(writer)
    }

    /// Opens an existing data file for appending.
    ///
    /// A zero-length file (a freshly truncated crash survivor) gets its
    /// header rewritten before any group can follow.
    pub fn append_to(path: &Path) -> TsFileResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                TsFileError::write_failed(format!("failed to open {}", path.display()), e)
            })?;

        let file_size = file
            .metadata()
            .map_err(|e| TsFileError::write_failed("failed to read file metadata", e))?
            .len();

        let mut writer = Self {
            path: path.to_path_buf(),
            file,
            file_size,
            buffered: BTreeMap::new(),
            buffered_points: 0,
        };
        if writer.file_size == 0 {
            writer.write_header()?;
        }
        Ok(writer)
    }

    fn write_header(&mut self) -> TsFileResult<()> {
        let header = file_header();
        self.file
            .write_all(&header)
            .map_err(|e| TsFileError::write_failed("failed to write file header", e))?;
        self.file
            .sync_all()
            .map_err(|e| TsFileError::write_failed("fsync failed after file header", e))?;
        self.file_size = header.len() as u64;
        Ok(())
    }

    /// Returns the path to the data file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current on-disk size in bytes (buffered points excluded).
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Returns the number of buffered, not-yet-flushed points.
    pub fn buffered_points(&self) -> usize {
        self.buffered_points
    }

    /// Buffers one point.
    ///
    /// Out-of-order timestamps are accepted; the buffer keeps points in
    /// timestamp order per series. A point for a timestamp that is already
    /// buffered overwrites it.
    ///
    /// # Errors
    ///
    /// `CHRONO_TSFILE_INVALID_WRITE` when the value's type disagrees with
    /// points already buffered for the same series.
    pub fn write_value(
        &mut self,
        device: &str,
        measurement: &str,
        timestamp: i64,
        value: FieldValue,
    ) -> TsFileResult<()> {
        let device_buffer = self.buffered.entry(device.to_string()).or_default();
        let (data_type, series) = device_buffer
            .entry(measurement.to_string())
            .or_insert_with(|| (value.data_type(), SeriesBuffer::new()));

        if *data_type != value.data_type() {
            return Err(TsFileError::invalid_write(format!(
                "type mismatch for {}.{}: buffered {} but got {}",
                device,
                measurement,
                data_type.type_name(),
                value.data_type().type_name()
            )));
        }

        if series.insert(timestamp, value).is_none() {
            self.buffered_points += 1;
        }
        Ok(())
    }

    /// Buffers a whole row: several measurements of one device at one
    /// timestamp.
    pub fn write_row(
        &mut self,
        device: &str,
        timestamp: i64,
        values: &[(String, FieldValue)],
    ) -> TsFileResult<()> {
        for (measurement, value) in values {
            self.write_value(device, measurement, timestamp, value.clone())?;
        }
        Ok(())
    }

    /// Flushes all buffered points as framed chunk groups, one group per
    /// device, then fsyncs.
    ///
    /// Returns the number of groups written. A writer with nothing buffered
    /// flushes zero groups and touches nothing.
    pub fn flush_chunk_groups(&mut self) -> TsFileResult<usize> {
        if self.buffered_points == 0 {
            self.buffered.clear();
            return Ok(0);
        }

        let mut groups_written = 0;
        let buffered = std::mem::take(&mut self.buffered);
        self.buffered_points = 0;

        for (device, measurements) in buffered {
            let chunks: Vec<ChunkData> = measurements
                .into_iter()
                .filter(|(_, (_, series))| !series.is_empty())
                .map(|(measurement, (data_type, series))| ChunkData {
                    measurement,
                    data_type,
                    points: series.into_iter().collect(),
                })
                .collect();
            if chunks.is_empty() {
                continue;
            }

            let group = ChunkGroup { device, chunks };
            let framed = group.serialize();
            self.file.write_all(&framed).map_err(|e| {
                TsFileError::write_failed(
                    format!("failed to write chunk group for {}", group.device),
                    e,
                )
            })?;
            self.file_size += framed.len() as u64;
            groups_written += 1;
        }

        self.file
            .sync_all()
            .map_err(|e| TsFileError::write_failed("fsync failed after chunk group flush", e))?;

        Ok(groups_written)
    }
}

#[cfg(test)]
mod tests {
    use super::super::chunk::HEADER_LEN;
    use super::super::reader::TsFileReader;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_writes_header() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("0.tsd");

        let writer = TsFileWriter::create(&path).unwrap();
        assert_eq!(writer.file_size(), HEADER_LEN);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), HEADER_LEN);
    }

    #[test]
    fn test_flush_writes_readable_groups() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("0.tsd");

        let mut writer = TsFileWriter::create(&path).unwrap();
        writer
            .write_row(
                "root.sg.d1",
                1,
                &[
                    ("s1".to_string(), FieldValue::Int32(1)),
                    ("s2".to_string(), FieldValue::Int64(1)),
                ],
            )
            .unwrap();
        writer
            .write_value("root.sg.d2", "s1", 3, FieldValue::Float(3.0))
            .unwrap();

        let groups = writer.flush_chunk_groups().unwrap();
        assert_eq!(groups, 2);
        assert_eq!(writer.buffered_points(), 0);

        let mut reader = TsFileReader::open(&path).unwrap();
        let metadata = reader
            .chunk_metadata_list("root.sg.d1", "s1")
            .unwrap();
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata[0].start_time, 1);
        assert_eq!(metadata[0].end_time, 1);
    }

    #[test]
    fn test_out_of_order_points_sorted_within_chunk() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("0.tsd");

        let mut writer = TsFileWriter::create(&path).unwrap();
        for t in [5i64, 1, 3] {
            writer
                .write_value("root.sg.d1", "s1", t, FieldValue::Int32(t as i32))
                .unwrap();
        }
        writer.flush_chunk_groups().unwrap();

        let mut reader = TsFileReader::open(&path).unwrap();
        let metadata = reader.chunk_metadata_list("root.sg.d1", "s1").unwrap();
        assert_eq!(metadata[0].start_time, 1);
        assert_eq!(metadata[0].end_time, 5);

        let points = reader.read_points(&metadata[0]).unwrap();
        let times: Vec<i64> = points.iter().map(|(t, _)| *t).collect();
        assert_eq!(times, vec![1, 3, 5]);
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("0.tsd");

        let mut writer = TsFileWriter::create(&path).unwrap();
        writer
            .write_value("root.sg.d1", "s1", 1, FieldValue::Int32(1))
            .unwrap();
        let err = writer
            .write_value("root.sg.d1", "s1", 2, FieldValue::Double(2.0))
            .unwrap_err();
        assert_eq!(err.code().code(), "CHRONO_TSFILE_INVALID_WRITE");
    }

    #[test]
    fn test_empty_flush_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("0.tsd");

        let mut writer = TsFileWriter::create(&path).unwrap();
        assert_eq!(writer.flush_chunk_groups().unwrap(), 0);
        assert_eq!(writer.file_size(), HEADER_LEN);
    }

    #[test]
    fn test_append_to_truncated_empty_file_rewrites_header() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("0.tsd");
        std::fs::write(&path, b"").unwrap();

        let writer = TsFileWriter::append_to(&path).unwrap();
        assert_eq!(writer.file_size(), HEADER_LEN);
    }

    #[test]
    fn test_append_to_continues_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("0.tsd");

        {
            let mut writer = TsFileWriter::create(&path).unwrap();
            writer
                .write_value("root.sg.d1", "s1", 1, FieldValue::Int32(1))
                .unwrap();
            writer.flush_chunk_groups().unwrap();
        }

        {
            let mut writer = TsFileWriter::append_to(&path).unwrap();
            writer
                .write_value("root.sg.d1", "s1", 2, FieldValue::Int32(2))
                .unwrap();
            writer.flush_chunk_groups().unwrap();
        }

        let mut reader = TsFileReader::open(&path).unwrap();
        let metadata = reader.chunk_metadata_list("root.sg.d1", "s1").unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata[1].start_time, 2);
    }
}
