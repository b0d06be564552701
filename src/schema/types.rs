//! Data types and point values for timeseries
//!
//! Every series has a fixed [`DataType`]; every stored point is a
//! `(timestamp, FieldValue)` pair whose value matches the series type.
//! The binary value encodings here are shared by the data file and the WAL.

use std::io::{self, Read};

use serde::{Deserialize, Serialize};

/// Supported series data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Boolean
    Boolean,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 32-bit floating point
    Float,
    /// 64-bit floating point
    Double,
    /// UTF-8 string
    Text,
}

impl DataType {
    /// Convert from the on-disk tag byte, `None` for unknown values.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DataType::Boolean),
            1 => Some(DataType::Int32),
            2 => Some(DataType::Int64),
            3 => Some(DataType::Float),
            4 => Some(DataType::Double),
            5 => Some(DataType::Text),
            _ => None,
        }
    }

    /// Convert to the on-disk tag byte.
    pub fn as_u8(self) -> u8 {
        match self {
            DataType::Boolean => 0,
            DataType::Int32 => 1,
            DataType::Int64 => 2,
            DataType::Float => 3,
            DataType::Double => 4,
            DataType::Text => 5,
        }
    }

    /// Returns the type name for error messages.
    pub fn type_name(self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float => "float",
            DataType::Double => "double",
            DataType::Text => "text",
        }
    }
}

/// A single point value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Boolean value
    Boolean(bool),
    /// 32-bit signed integer value
    Int32(i32),
    /// 64-bit signed integer value
    Int64(i64),
    /// 32-bit floating point value
    Float(f32),
    /// 64-bit floating point value
    Double(f64),
    /// UTF-8 string value
    Text(String),
}

impl FieldValue {
    /// The data type this value belongs to.
    pub fn data_type(&self) -> DataType {
        match self {
            FieldValue::Boolean(_) => DataType::Boolean,
            FieldValue::Int32(_) => DataType::Int32,
            FieldValue::Int64(_) => DataType::Int64,
            FieldValue::Float(_) => DataType::Float,
            FieldValue::Double(_) => DataType::Double,
            FieldValue::Text(_) => DataType::Text,
        }
    }

    /// Appends the value's binary encoding.
    ///
    /// Fixed-width types are little-endian; text is a u32 length prefix
    /// followed by UTF-8 bytes. The type tag is not part of the encoding and
    /// must be carried by the surrounding format.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            FieldValue::Boolean(v) => buf.push(u8::from(*v)),
            FieldValue::Int32(v) => buf.extend_from_slice(&v.to_le_bytes()),
            FieldValue::Int64(v) => buf.extend_from_slice(&v.to_le_bytes()),
            FieldValue::Float(v) => buf.extend_from_slice(&v.to_le_bytes()),
            FieldValue::Double(v) => buf.extend_from_slice(&v.to_le_bytes()),
            FieldValue::Text(v) => {
                buf.extend_from_slice(&(v.len() as u32).to_le_bytes());
                buf.extend_from_slice(v.as_bytes());
            }
        }
    }

    /// Reads a value of the given type from a reader.
    pub fn read_from<R: Read>(reader: &mut R, data_type: DataType) -> io::Result<Self> {
        match data_type {
            DataType::Boolean => {
                let mut b = [0u8; 1];
                reader.read_exact(&mut b)?;
                Ok(FieldValue::Boolean(b[0] != 0))
            }
            DataType::Int32 => {
                let mut b = [0u8; 4];
                reader.read_exact(&mut b)?;
                Ok(FieldValue::Int32(i32::from_le_bytes(b)))
            }
            DataType::Int64 => {
                let mut b = [0u8; 8];
                reader.read_exact(&mut b)?;
                Ok(FieldValue::Int64(i64::from_le_bytes(b)))
            }
            DataType::Float => {
                let mut b = [0u8; 4];
                reader.read_exact(&mut b)?;
                Ok(FieldValue::Float(f32::from_le_bytes(b)))
            }
            DataType::Double => {
                let mut b = [0u8; 8];
                reader.read_exact(&mut b)?;
                Ok(FieldValue::Double(f64::from_le_bytes(b)))
            }
            DataType::Text => {
                let mut len_buf = [0u8; 4];
                reader.read_exact(&mut len_buf)?;
                let len = u32::from_le_bytes(len_buf) as usize;
                let mut bytes = vec![0u8; len];
                reader.read_exact(&mut bytes)?;
                let text = String::from_utf8(bytes).map_err(|e| {
                    io::Error::new(io::ErrorKind::InvalidData, format!("invalid UTF-8: {}", e))
                })?;
                Ok(FieldValue::Text(text))
            }
        }
    }
}
