//! Chunk group format
//!
//! A data file is a 6-byte header (magic + format version) followed by a
//! sequence of chunk groups. Each group holds the chunks of one device:
//!
//! - Group Length (u32 LE) - total framed length including this field
//! - Device (u32-length-prefixed UTF-8)
//! - Chunk Count (u32 LE)
//! - Chunks (variable, see below)
//! - Checksum (u32 LE, CRC32 over length field + body)
//!
//! Each chunk:
//!
//! - Measurement (len-prefixed UTF-8)
//! - Data Type (u8)
//! - Point Count (u32 LE)
//! - Start Time (i64 LE) / End Time (i64 LE) - inline statistics
//! - Data Length (u32 LE)
//! - Points: Point Count x (Timestamp i64 LE + value encoding)
//!
//! The group is the smallest structurally verifiable unit: recovery trusts
//! a file exactly up to the last group whose frame and checksum hold.

use std::io::{self, Cursor, Read};

use crate::schema::{DataType, FieldValue};

use super::checksum::compute_checksum;

/// Magic bytes opening every data file.
pub const MAGIC: &[u8; 4] = b"CHRN";

/// Current data file format version.
pub const FORMAT_VERSION: u16 = 1;

/// Header length: magic + version.
pub const HEADER_LEN: u64 = 6;

/// Serializes the file header.
pub fn file_header() -> [u8; HEADER_LEN as usize] {
    let mut header = [0u8; HEADER_LEN as usize];
    header[..4].copy_from_slice(MAGIC);
    header[4..].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
    header
}

/// One chunk: the points of a single measurement within a group.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkData {
    /// Measurement name
    pub measurement: String,
    /// Data type of every point value
    pub data_type: DataType,
    /// Points in ascending timestamp order
    pub points: Vec<(i64, FieldValue)>,
}

impl ChunkData {
    /// Smallest timestamp in the chunk.
    pub fn start_time(&self) -> i64 {
        self.points.first().map(|(t, _)| *t).unwrap_or(i64::MAX)
    }

    /// Largest timestamp in the chunk.
    pub fn end_time(&self) -> i64 {
        self.points.last().map(|(t, _)| *t).unwrap_or(i64::MIN)
    }
}

/// A chunk group: all chunks of one device written in a single flush.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkGroup {
    /// Device identifier
    pub device: String,
    /// Chunks, one per measurement
    pub chunks: Vec<ChunkData>,
}

/// Summary of one chunk as read back from a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// Device identifier
    pub device: String,
    /// Measurement name
    pub measurement: String,
    /// Data type of the chunk's values
    pub data_type: DataType,
    /// Number of points
    pub point_count: u32,
    /// Smallest timestamp
    pub start_time: i64,
    /// Largest timestamp
    pub end_time: i64,
    /// Byte offset of the owning group's frame in the file
    pub group_offset: u64,
}

impl ChunkGroup {
    /// Serializes the group body (everything between length field and
    /// checksum).
    fn serialize_body(&self) -> Vec<u8> {
        let mut body = Vec::new();

        body.extend_from_slice(&(self.device.len() as u32).to_le_bytes());
        body.extend_from_slice(self.device.as_bytes());
        body.extend_from_slice(&(self.chunks.len() as u32).to_le_bytes());

        for chunk in &self.chunks {
            body.extend_from_slice(&(chunk.measurement.len() as u32).to_le_bytes());
            body.extend_from_slice(chunk.measurement.as_bytes());
            body.push(chunk.data_type.as_u8());
            body.extend_from_slice(&(chunk.points.len() as u32).to_le_bytes());
            body.extend_from_slice(&chunk.start_time().to_le_bytes());
            body.extend_from_slice(&chunk.end_time().to_le_bytes());

            let mut data = Vec::new();
            for (timestamp, value) in &chunk.points {
                data.extend_from_slice(&timestamp.to_le_bytes());
                value.write_to(&mut data);
            }
            body.extend_from_slice(&(data.len() as u32).to_le_bytes());
            body.extend_from_slice(&data);
        }

        body
    }

    /// Serializes the complete framed group.
    ///
    /// Frame: Group Length (u32 LE, total including itself), body,
    /// CRC32 (u32 LE) over the length field plus the body.
    pub fn serialize(&self) -> Vec<u8> {
        let body = self.serialize_body();
        let group_length = (4 + body.len() + 4) as u32;

        let mut checksum_data = Vec::with_capacity(4 + body.len());
        checksum_data.extend_from_slice(&group_length.to_le_bytes());
        checksum_data.extend_from_slice(&body);
        let checksum = compute_checksum(&checksum_data);

        let mut framed = Vec::with_capacity(group_length as usize);
        framed.extend_from_slice(&group_length.to_le_bytes());
        framed.extend_from_slice(&body);
        framed.extend_from_slice(&checksum.to_le_bytes());
        framed
    }

    /// Deserializes a framed group from bytes, verifying the checksum.
    ///
    /// Returns the group and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        // length + empty device + chunk count + checksum
        const MIN_GROUP_SIZE: usize = 4 + 4 + 4 + 4;

        if data.len() < MIN_GROUP_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "chunk group too short",
            ));
        }

        let group_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
        if group_length < MIN_GROUP_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid chunk group length: {}", group_length),
            ));
        }
        if data.len() < group_length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "chunk group truncated: expected {} bytes, got {}",
                    group_length,
                    data.len()
                ),
            ));
        }

        let checksum_offset = group_length - 4;
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
                    "chunk group checksum mismatch: computed {:08x}, stored {:08x}",
                    computed_checksum, stored_checksum
                ),
            ));
        }

        let mut cursor = Cursor::new(&data[4..checksum_offset]);
        let device = read_string(&mut cursor)?;
        let chunk_count = read_u32(&mut cursor)?;

        let mut chunks = Vec::with_capacity(chunk_count as usize);
        for _ in 0..chunk_count {
            let measurement = read_string(&mut cursor)?;

            let mut type_buf = [0u8; 1];
            cursor.read_exact(&mut type_buf)?;
            let data_type = DataType::from_u8(type_buf[0]).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("invalid data type tag: {}", type_buf[0]),
                )
            })?;

            let point_count = read_u32(&mut cursor)?;
            let start_time = read_i64(&mut cursor)?;
            let end_time = read_i64(&mut cursor)?;
            let data_len = read_u32(&mut cursor)?;

            let data_start = cursor.position();
            let mut points = Vec::with_capacity(point_count as usize);
            for _ in 0..point_count {
                let timestamp = read_i64(&mut cursor)?;
                let value = FieldValue::read_from(&mut cursor, data_type)?;
                points.push((timestamp, value));
            }

            let consumed = cursor.position() - data_start;
            if consumed != data_len as u64 {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "chunk data length mismatch: declared {}, consumed {}",
                        data_len, consumed
                    ),
                ));
            }

            let chunk = ChunkData {
                measurement,
                data_type,
                points,
            };
            if point_count > 0 && (chunk.start_time() != start_time || chunk.end_time() != end_time)
            {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "chunk statistics disagree with point data",
                ));
            }
            chunks.push(chunk);
        }

        Ok((ChunkGroup { device, chunks }, group_length))
    }

    /// Builds per-chunk metadata for a group framed at `group_offset`.
    pub fn metadata(&self, group_offset: u64) -> Vec<ChunkMetadata> {
        self.chunks
            .iter()
            .map(|chunk| ChunkMetadata {
                device: self.device.clone(),
                measurement: chunk.measurement.clone(),
                data_type: chunk.data_type,
                point_count: chunk.points.len() as u32,
                start_time: chunk.start_time(),
                end_time: chunk.end_time(),
                group_offset,
            })
            .collect()
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

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_group() -> ChunkGroup {
        ChunkGroup {
            device: "root.sg.d1".to_string(),
            chunks: vec![
                ChunkData {
                    measurement: "s1".to_string(),
                    data_type: DataType::Int32,
                    points: vec![(1, FieldValue::Int32(1)), (2, FieldValue::Int32(2))],
                },
                ChunkData {
                    measurement: "s2".to_string(),
                    data_type: DataType::Double,
                    points: vec![(1, FieldValue::Double(1.0)), (2, FieldValue::Double(2.0))],
                },
            ],
        }
    }

    #[test]
    fn test_group_roundtrip() {
        let group = sample_group();
        let framed = group.serialize();
        let (decoded, consumed) = ChunkGroup::deserialize(&framed).unwrap();
        assert_eq!(decoded, group);
        assert_eq!(consumed, framed.len());
    }

    #[test]
    fn test_inline_statistics() {
        let group = sample_group();
        let metadata = group.metadata(HEADER_LEN);
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata[0].start_time, 1);
        assert_eq!(metadata[0].end_time, 2);
        assert_eq!(metadata[0].point_count, 2);
        assert_eq!(metadata[0].group_offset, HEADER_LEN);
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let mut framed = sample_group().serialize();
        let mid = framed.len() / 2;
        framed[mid] ^= 0xFF;

        let result = ChunkGroup::deserialize(&framed);
        assert!(result.is_err());
    }

    #[test]
    fn test_truncated_group_detected() {
        let framed = sample_group().serialize();
        let truncated = &framed[..framed.len() - 6];
        assert!(ChunkGroup::deserialize(truncated).is_err());
    }

    #[test]
    fn test_deterministic_serialization() {
        let group = sample_group();
        assert_eq!(group.serialize(), group.serialize());
    }
}
