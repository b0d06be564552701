//! In-memory table
//!
//! The mutable buffer bound to one unsealed data file. During recovery it
//! collects redone inserts (and absorbs redone deletes against them) until
//! finalization drains it into the file as fresh chunk groups. Rows are
//! kept ordered per series so a drain writes time-sorted chunks without a
//! separate sort pass.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::schema::FieldValue;
use crate::series::SeriesPath;
use crate::tsfile::{TsFileResult, TsFileWriter};

type SeriesRows = BTreeMap<i64, FieldValue>;
type DeviceRows = BTreeMap<String, SeriesRows>;

/// The in-memory table of one unsealed data file.
#[derive(Debug)]
pub struct MemTable {
    /// This table's identifier; WAL entries carry it for attribution
    table_id: u64,
    /// device -> measurement -> time -> value
    devices: BTreeMap<String, DeviceRows>,
    /// Total points across all series
    total_points: usize,
}

impl MemTable {
    /// Creates an empty table.
    pub fn new(table_id: u64) -> Self {
        Self {
            table_id,
            devices: BTreeMap::new(),
            total_points: 0,
        }
    }

    /// This table's identifier.
    pub fn table_id(&self) -> u64 {
        self.table_id
    }

    /// Whether the table holds no points.
    pub fn is_empty(&self) -> bool {
        self.total_points == 0
    }

    /// Total points across all series.
    pub fn total_points(&self) -> usize {
        self.total_points
    }

    /// Inserts one row: several measurement values of one device at one
    /// timestamp. A value for an already-present timestamp overwrites it.
    pub fn insert_row(&mut self, device: &str, timestamp: i64, values: &[(String, FieldValue)]) {
        let device_rows = self.devices.entry(device.to_string()).or_default();
        for (measurement, value) in values {
            let series = device_rows.entry(measurement.clone()).or_default();
            if series.insert(timestamp, value.clone()).is_none() {
                self.total_points += 1;
            }
        }
    }

    /// Removes every point covered by `path` within `[start_time,
    /// end_time]`. Returns the number of points removed.
    pub fn delete_range(&mut self, path: &SeriesPath, start_time: i64, end_time: i64) -> usize {
        let mut removed = 0;
        for (device, device_rows) in &mut self.devices {
            for (measurement, series) in device_rows.iter_mut() {
                if !path.covers(device, measurement) {
                    continue;
                }
                let doomed: Vec<i64> = series
                    .range((Bound::Included(start_time), Bound::Included(end_time)))
                    .map(|(t, _)| *t)
                    .collect();
                removed += doomed.len();
                for timestamp in doomed {
                    series.remove(&timestamp);
                }
            }
        }
        self.total_points -= removed;
        removed
    }

    /// The points of one series, in timestamp order.
    pub fn series_points(&self, device: &str, measurement: &str) -> Vec<(i64, FieldValue)> {
        self.devices
            .get(device)
            .and_then(|rows| rows.get(measurement))
            .map(|series| series.iter().map(|(t, v)| (*t, v.clone())).collect())
            .unwrap_or_default()
    }

    /// Drains every point into the writer's buffer.
    ///
    /// The caller owns the flush: nothing reaches disk until it calls
    /// `flush_chunk_groups`. The table is empty afterwards.
    pub fn drain_into(&mut self, writer: &mut TsFileWriter) -> TsFileResult<()> {
        let devices = std::mem::take(&mut self.devices);
        self.total_points = 0;

        for (device, device_rows) in devices {
            for (measurement, series) in device_rows {
                for (timestamp, value) in series {
                    writer.write_value(&device, &measurement, timestamp, value)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldValue;
    use tempfile::TempDir;

    fn path(s: &str) -> SeriesPath {
        SeriesPath::new(s).unwrap()
    }

    #[test]
    fn test_insert_and_read_back() {
        let mut table = MemTable::new(1);
        table.insert_row(
            "root.sg.d1",
            1,
            &[
                ("s1".to_string(), FieldValue::Int32(1)),
                ("s2".to_string(), FieldValue::Int64(1)),
            ],
        );
        table.insert_row("root.sg.d1", 2, &[("s1".to_string(), FieldValue::Int32(2))]);

        assert_eq!(table.total_points(), 3);
        assert_eq!(
            table.series_points("root.sg.d1", "s1"),
            vec![(1, FieldValue::Int32(1)), (2, FieldValue::Int32(2))]
        );
    }

    #[test]
    fn test_overwrite_same_timestamp() {
        let mut table = MemTable::new(1);
        table.insert_row("root.sg.d1", 1, &[("s1".to_string(), FieldValue::Int32(1))]);
        table.insert_row("root.sg.d1", 1, &[("s1".to_string(), FieldValue::Int32(9))]);

        assert_eq!(table.total_points(), 1);
        assert_eq!(
            table.series_points("root.sg.d1", "s1"),
            vec![(1, FieldValue::Int32(9))]
        );
    }

    #[test]
    fn test_delete_range_device_path() {
        let mut table = MemTable::new(1);
        table.insert_row(
            "root.sg.d2",
            4,
            &[
                ("s1".to_string(), FieldValue::Float(4.0)),
                ("s2".to_string(), FieldValue::Double(4.0)),
            ],
        );
        table.insert_row("root.sg.d1", 4, &[("s1".to_string(), FieldValue::Int32(4))]);

        let removed = table.delete_range(&path("root.sg.d2"), i64::MIN, i64::MAX);
        assert_eq!(removed, 2);
        assert!(table.series_points("root.sg.d2", "s1").is_empty());
        // Other devices untouched.
        assert_eq!(table.series_points("root.sg.d1", "s1").len(), 1);
    }

    #[test]
    fn test_delete_range_respects_bounds() {
        let mut table = MemTable::new(1);
        for t in 1..=5 {
            table.insert_row(
                "root.sg.d1",
                t,
                &[("s1".to_string(), FieldValue::Int32(t as i32))],
            );
        }

        let removed = table.delete_range(&path("root.sg.d1.s1"), 2, 4);
        assert_eq!(removed, 3);
        let times: Vec<i64> = table
            .series_points("root.sg.d1", "s1")
            .iter()
            .map(|(t, _)| *t)
            .collect();
        assert_eq!(times, vec![1, 5]);
    }

    #[test]
    fn test_drain_into_writer() {
        let temp_dir = TempDir::new().unwrap();
        let tsfile = temp_dir.path().join("0.tsd");
        let mut writer = TsFileWriter::create(&tsfile).unwrap();

        let mut table = MemTable::new(1);
        table.insert_row("root.sg.d1", 1, &[("s1".to_string(), FieldValue::Int32(1))]);
        table.insert_row("root.sg.d1", 2, &[("s1".to_string(), FieldValue::Int32(2))]);

        table.drain_into(&mut writer).unwrap();
        assert!(table.is_empty());
        assert_eq!(writer.buffered_points(), 2);

        writer.flush_chunk_groups().unwrap();

        let mut reader = crate::tsfile::TsFileReader::open(&tsfile).unwrap();
        let metadata = reader.chunk_metadata_list("root.sg.d1", "s1").unwrap();
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata[0].point_count, 2);
    }
}
