//! WAL entry types
//!
//! Each entry records one not-yet-durable operation, tagged with the
//! identifier of the in-memory table it originated from. The operation is
//! a closed enum consumed by exhaustive match during redo: there are
//! exactly two kinds of logged mutation, an inserted row and a deleted
//! time range, and the compiler holds the dispatcher to both.
//!
//! On-disk record:
//! - Record Length (u32 LE) - total record length including this field
//! - Table Id (u64 LE)
//! - Operation Tag (u8): 0 = insert row, 1 = delete range
//! - Operation Payload (variable)
//! - Checksum (u32 LE, CRC32 over length field + body)

use std::io::{self, Cursor, Read};

use crate::schema::{DataType, FieldValue};
use crate::series::SeriesPath;

use super::checksum::compute_checksum;

const OP_INSERT_ROW: u8 = 0;
const OP_DELETE_RANGE: u8 = 1;

/// A logged mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// One row of one device: several measurement values at one timestamp.
    InsertRow {
        /// Device identifier
        device: String,
        /// Row timestamp
        timestamp: i64,
        /// Measurement name and value pairs
        values: Vec<(String, FieldValue)>,
    },
    /// A delete of every point of `path` within `[start_time, end_time]`.
    DeleteRange {
        /// Covered path (device or full series)
        path: SeriesPath,
        /// Interval start
        start_time: i64,
        /// Interval end
        end_time: i64,
    },
}

/// One WAL entry: an operation attributed to its in-memory table.
#[derive(Debug, Clone, PartialEq)]
pub struct WalEntry {
    /// Identifier of the originating in-memory table
    pub table_id: u64,
    /// The logged operation
    pub operation: Operation,
}

impl WalEntry {
    /// Creates an insert-row entry.
    pub fn insert_row(
        table_id: u64,
        device: impl Into<String>,
        timestamp: i64,
        values: Vec<(String, FieldValue)>,
    ) -> Self {
        Self {
            table_id,
            operation: Operation::InsertRow {
                device: device.into(),
                timestamp,
                values,
            },
        }
    }

    /// Creates a delete-range entry.
    pub fn delete_range(table_id: u64, path: SeriesPath, start_time: i64, end_time: i64) -> Self {
        Self {
            table_id,
            operation: Operation::DeleteRange {
                path,
                start_time,
                end_time,
            },
        }
    }

    /// Serializes the record body (everything between length field and
    /// checksum).
    fn serialize_body(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&self.table_id.to_le_bytes());

        match &self.operation {
            Operation::InsertRow {
                device,
                timestamp,
                values,
            } => {
                body.push(OP_INSERT_ROW);
                body.extend_from_slice(&(device.len() as u32).to_le_bytes());
                body.extend_from_slice(device.as_bytes());
                body.extend_from_slice(&timestamp.to_le_bytes());
                body.extend_from_slice(&(values.len() as u32).to_le_bytes());
                for (measurement, value) in values {
                    body.extend_from_slice(&(measurement.len() as u32).to_le_bytes());
                    body.extend_from_slice(measurement.as_bytes());
                    body.push(value.data_type().as_u8());
                    value.write_to(&mut body);
                }
            }
            Operation::DeleteRange {
                path,
                start_time,
                end_time,
            } => {
                body.push(OP_DELETE_RANGE);
                let path_bytes = path.as_str().as_bytes();
                body.extend_from_slice(&(path_bytes.len() as u32).to_le_bytes());
                body.extend_from_slice(path_bytes);
                body.extend_from_slice(&start_time.to_le_bytes());
                body.extend_from_slice(&end_time.to_le_bytes());
            }
        }

        body
    }

    /// Serializes the complete framed record.
    pub fn serialize(&self) -> Vec<u8> {
        let body = self.serialize_body();
        let record_length = (4 + body.len() + 4) as u32;

        let mut checksum_data = Vec::with_capacity(4 + body.len());
        checksum_data.extend_from_slice(&record_length.to_le_bytes());
        checksum_data.extend_from_slice(&body);
        let checksum = compute_checksum(&checksum_data);

        let mut record = Vec::with_capacity(record_length as usize);
        record.extend_from_slice(&record_length.to_le_bytes());
        record.extend_from_slice(&body);
        record.extend_from_slice(&checksum.to_le_bytes());
        record
    }

    /// Deserializes a framed record, verifying the checksum.
    ///
    /// Returns the entry and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        // length + table id + op tag + checksum
        const MIN_RECORD_SIZE: usize = 4 + 8 + 1 + 4;

        if data.len() < MIN_RECORD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "WAL record too short",
            ));
        }

        let record_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if record_length < MIN_RECORD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid WAL record length: {}", record_length),
            ));
        }
        if data.len() < record_length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "WAL record truncated: expected {} bytes, got {}",
                    record_length,
                    data.len()
                ),
            ));
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
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "WAL checksum mismatch: computed {:08x}, stored {:08x}",
                    computed_checksum, stored_checksum
                ),
            ));
        }

        let mut cursor = Cursor::new(&data[4..checksum_offset]);

        let mut id_buf = [0u8; 8];
        cursor.read_exact(&mut id_buf)?;
        let table_id = u64::from_le_bytes(id_buf);

        let mut tag = [0u8; 1];
        cursor.read_exact(&mut tag)?;

        let operation = match tag[0] {
            OP_INSERT_ROW => {
                let device = read_string(&mut cursor)?;
                let timestamp = read_i64(&mut cursor)?;
                let value_count = read_u32(&mut cursor)?;

                let mut values = Vec::with_capacity(value_count as usize);
                for _ in 0..value_count {
                    let measurement = read_string(&mut cursor)?;
                    let mut type_buf = [0u8; 1];
                    cursor.read_exact(&mut type_buf)?;
                    let data_type = DataType::from_u8(type_buf[0]).ok_or_else(|| {
                        io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("invalid data type tag: {}", type_buf[0]),
                        )
                    })?;
                    let value = FieldValue::read_from(&mut cursor, data_type)?;
                    values.push((measurement, value));
                }

                Operation::InsertRow {
                    device,
                    timestamp,
                    values,
                }
            }
            OP_DELETE_RANGE => {
                let path_string = read_string(&mut cursor)?;
                let path = SeriesPath::new(path_string)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
                let start_time = read_i64(&mut cursor)?;
                let end_time = read_i64(&mut cursor)?;
                Operation::DeleteRange {
                    path,
                    start_time,
                    end_time,
                }
            }
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("invalid operation tag: {}", other),
                ))
            }
        };

        Ok((
            WalEntry {
                table_id,
                operation,
            },
            record_length,
        ))
    }
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_i64<R: Read>(reader: &mut R) -> io::Result<i64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

fn read_string<R: Read>(reader: &mut R) -> io::Result<String> {
    let len = read_u32(reader)? as usize;
    let mut bytes = vec![0u8; len];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("invalid UTF-8: {}", e)))
}
