//! Per-file time-range index ("resource")
//!
//! Every data file carries an in-memory map from device to the
//! `[start_time, end_time]` span of its points, persisted to a sidecar
//! file next to the data file. The sidecar doubles as a completion marker:
//! a data file without one was never fully flushed and closed, which is
//! exactly what recovery checks first after a restart.
//!
//! The map only ever widens: `update` lowers the start or raises the end,
//! never the reverse, so points may arrive in any order. A closed index is
//! frozen and its sidecar records the closed flag.

mod errors;

pub use errors::{ResourceError, ResourceErrorCode, ResourceResult, Severity};

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use crate::tsfile::{compute_checksum, verify_checksum};

/// Suffix appended to a data file path to name its sidecar.
pub const RESOURCE_SUFFIX: &str = ".resource";

/// Sidecar path for a data file.
pub fn resource_path_for(tsfile_path: &Path) -> PathBuf {
    let mut os: OsString = tsfile_path.as_os_str().to_os_string();
    os.push(RESOURCE_SUFFIX);
    PathBuf::from(os)
}

/// Authoritative per-device time bounds for one data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeRangeIndex {
    /// Path of the owning data file
    tsfile_path: PathBuf,
    /// Device -> (start_time, end_time)
    device_ranges: BTreeMap<String, (i64, i64)>,
    /// Whether the owning file is sealed
    closed: bool,
}

impl TimeRangeIndex {
    /// Creates an empty, open index for a data file.
    pub fn new(tsfile_path: &Path) -> Self {
        Self {
            tsfile_path: tsfile_path.to_path_buf(),
            device_ranges: BTreeMap::new(),
            closed: false,
        }
    }

    /// Path of the owning data file.
    pub fn tsfile_path(&self) -> &Path {
        &self.tsfile_path
    }

    /// Path of the sidecar file.
    pub fn resource_path(&self) -> PathBuf {
        resource_path_for(&self.tsfile_path)
    }

    /// Whether the sidecar file exists on disk.
    pub fn resource_exists(&self) -> bool {
        self.resource_path().exists()
    }

    /// Whether the index is sealed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Widens the device's range to include `timestamp`.
    ///
    /// First observation of a device sets both bounds; later observations
    /// only lower the start or raise the end. Input order is irrelevant.
    pub fn update(&mut self, device: &str, timestamp: i64) {
        match self.device_ranges.get_mut(device) {
            Some((start, end)) => {
                if timestamp < *start {
                    *start = timestamp;
                }
                if timestamp > *end {
                    *end = timestamp;
                }
            }
            None => {
                self.device_ranges
                    .insert(device.to_string(), (timestamp, timestamp));
            }
        }
    }

    /// Smallest recorded timestamp of a device.
    ///
    /// # Errors
    ///
    /// `CHRONO_RESOURCE_DEVICE_NOT_FOUND` when the device was never
    /// observed.
    pub fn get_start_time(&self, device: &str) -> ResourceResult<i64> {
        self.device_ranges
            .get(device)
            .map(|(start, _)| *start)
            .ok_or_else(|| ResourceError::device_not_found(device))
    }

    /// Largest recorded timestamp of a device.
    ///
    /// # Errors
    ///
    /// `CHRONO_RESOURCE_DEVICE_NOT_FOUND` when the device was never
    /// observed.
    pub fn get_end_time(&self, device: &str) -> ResourceResult<i64> {
        self.device_ranges
            .get(device)
            .map(|(_, end)| *end)
            .ok_or_else(|| ResourceError::device_not_found(device))
    }

    /// Devices with a recorded range, in sorted order.
    pub fn devices(&self) -> impl Iterator<Item = &str> {
        self.device_ranges.keys().map(|s| s.as_str())
    }

    /// Number of devices with a recorded range.
    pub fn device_count(&self) -> usize {
        self.device_ranges.len()
    }

    /// Discards every recorded range.
    ///
    /// Recovery rebuilds the index from the data file's valid content and
    /// must never merge with ranges that may reference truncated bytes.
    pub fn clear(&mut self) {
        self.device_ranges.clear();
    }

    /// Serializes the sidecar body: closed flag, device count, then per
    /// device its name (len-prefixed), start and end times.
    fn serialize_body(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.push(u8::from(self.closed));
        body.extend_from_slice(&(self.device_ranges.len() as u32).to_le_bytes());
        for (device, (start, end)) in &self.device_ranges {
            body.extend_from_slice(&(device.len() as u32).to_le_bytes());
            body.extend_from_slice(device.as_bytes());
            body.extend_from_slice(&start.to_le_bytes());
            body.extend_from_slice(&end.to_le_bytes());
        }
        body
    }

    /// Writes the sidecar file atomically (temp file, fsync, rename).
    pub fn persist(&self) -> ResourceResult<()> {
        let body = self.serialize_body();
        let total_length = (4 + body.len() + 4) as u32;

        let mut checksum_data = Vec::with_capacity(4 + body.len());
        checksum_data.extend_from_slice(&total_length.to_le_bytes());
        checksum_data.extend_from_slice(&body);
        let checksum = compute_checksum(&checksum_data);

        let resource_path = self.resource_path();
        let temp_path = {
            let mut os: OsString = resource_path.as_os_str().to_os_string();
            os.push(".tmp");
            PathBuf::from(os)
        };

        {
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| {
                    ResourceError::io_failed(
                        format!("failed to create {}", temp_path.display()),
                        e,
                    )
                })?;
            file.write_all(&total_length.to_le_bytes())
                .and_then(|_| file.write_all(&body))
                .and_then(|_| file.write_all(&checksum.to_le_bytes()))
                .map_err(|e| ResourceError::io_failed("failed to write sidecar", e))?;
            file.sync_all()
                .map_err(|e| ResourceError::io_failed("fsync failed on sidecar", e))?;
        }

        fs::rename(&temp_path, &resource_path).map_err(|e| {
            ResourceError::io_failed(
                format!("failed to rename sidecar into {}", resource_path.display()),
                e,
            )
        })?;
        Ok(())
    }

    /// Seals the index and persists the sidecar with the closed flag set.
    pub fn close(&mut self) -> ResourceResult<()> {
        self.closed = true;
        self.persist()
    }

    /// Loads the sidecar of a data file.
    pub fn load(tsfile_path: &Path) -> ResourceResult<Self> {
        let resource_path = resource_path_for(tsfile_path);
        let mut file = File::open(&resource_path).map_err(|e| {
            ResourceError::io_failed(format!("failed to open {}", resource_path.display()), e)
        })?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .map_err(|e| ResourceError::io_failed("failed to read sidecar", e))?;

        if contents.len() < 4 + 1 + 4 + 4 {
            return Err(ResourceError::corruption("sidecar too short"));
        }

        let total_length =
            u32::from_le_bytes([contents[0], contents[1], contents[2], contents[3]]) as usize;
        if total_length != contents.len() {
            return Err(ResourceError::corruption(format!(
                "sidecar length mismatch: declared {}, actual {}",
                total_length,
                contents.len()
            )));
        }

        let checksum_offset = contents.len() - 4;
        let stored_checksum = u32::from_le_bytes([
            contents[checksum_offset],
            contents[checksum_offset + 1],
            contents[checksum_offset + 2],
            contents[checksum_offset + 3],
        ]);
        if !verify_checksum(&contents[..checksum_offset], stored_checksum) {
            return Err(ResourceError::corruption("sidecar checksum mismatch"));
        }

        let mut cursor = Cursor::new(&contents[4..checksum_offset]);
        let mut flag = [0u8; 1];
        cursor
            .read_exact(&mut flag)
            .map_err(|e| ResourceError::corruption(format!("truncated sidecar body: {}", e)))?;
        let closed = flag[0] != 0;

        let mut count_buf = [0u8; 4];
        cursor
            .read_exact(&mut count_buf)
            .map_err(|e| ResourceError::corruption(format!("truncated sidecar body: {}", e)))?;
        let device_count = u32::from_le_bytes(count_buf);

        let mut device_ranges = BTreeMap::new();
        for _ in 0..device_count {
            let mut len_buf = [0u8; 4];
            cursor
                .read_exact(&mut len_buf)
                .map_err(|e| ResourceError::corruption(format!("truncated device entry: {}", e)))?;
            let len = u32::from_le_bytes(len_buf) as usize;

            let mut name = vec![0u8; len];
            cursor
                .read_exact(&mut name)
                .map_err(|e| ResourceError::corruption(format!("truncated device entry: {}", e)))?;
            let device = String::from_utf8(name)
                .map_err(|e| ResourceError::corruption(format!("invalid device name: {}", e)))?;

            let mut time_buf = [0u8; 8];
            cursor
                .read_exact(&mut time_buf)
                .map_err(|e| ResourceError::corruption(format!("truncated device entry: {}", e)))?;
            let start = i64::from_le_bytes(time_buf);
            cursor
                .read_exact(&mut time_buf)
                .map_err(|e| ResourceError::corruption(format!("truncated device entry: {}", e)))?;
            let end = i64::from_le_bytes(time_buf);

            device_ranges.insert(device, (start, end));
        }

        Ok(Self {
            tsfile_path: tsfile_path.to_path_buf(),
            device_ranges,
            closed,
        })
    }
}
