//! Series schema registry
//!
//! Recovery interprets insert operations through a [`SchemaProvider`]: the
//! provider tells it which data type a `device.measurement` series carries.
//! The provider is always passed in explicitly by the caller; nothing in
//! this crate reaches for a process-wide registry.

use std::collections::HashMap;

use super::errors::{SchemaError, SchemaResult};
use super::types::DataType;
use crate::series::SeriesPath;

/// Series type lookup used to interpret insert operations.
pub trait SchemaProvider {
    /// Returns the registered data type of `device`.`measurement`, or
    /// `None` when no such series exists.
    fn data_type(&self, device: &str, measurement: &str) -> Option<DataType>;
}

/// In-memory schema registry keyed by full series path.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    series: HashMap<String, DataType>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a series under a full path (`device.measurement`).
    ///
    /// # Errors
    ///
    /// `NotASeries` if the path has no measurement segment,
    /// `DuplicateSeries` if the series was already registered.
    pub fn register_series(&mut self, path: &SeriesPath, data_type: DataType) -> SchemaResult<()> {
        if path.split().is_none() {
            return Err(SchemaError::NotASeries {
                path: path.as_str().to_string(),
            });
        }
        if self.series.contains_key(path.as_str()) {
            return Err(SchemaError::DuplicateSeries {
                path: path.as_str().to_string(),
            });
        }
        self.series.insert(path.as_str().to_string(), data_type);
        Ok(())
    }

    /// Number of registered series.
    pub fn series_count(&self) -> usize {
        self.series.len()
    }
}

impl SchemaProvider for SchemaRegistry {
    fn data_type(&self, device: &str, measurement: &str) -> Option<DataType> {
        let mut key = String::with_capacity(device.len() + 1 + measurement.len());
        key.push_str(device);
        key.push('.');
        key.push_str(measurement);
        self.series.get(&key).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> SeriesPath {
        SeriesPath::new(s).unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = SchemaRegistry::new();
        registry
            .register_series(&path("root.sg.d1.s1"), DataType::Int32)
            .unwrap();

        assert_eq!(
            registry.data_type("root.sg.d1", "s1"),
            Some(DataType::Int32)
        );
        assert_eq!(registry.data_type("root.sg.d1", "s2"), None);
        assert_eq!(registry.data_type("root.sg.d2", "s1"), None);
    }

    #[test]
    fn test_device_path_rejected() {
        let mut registry = SchemaRegistry::new();
        let err = registry
            .register_series(&path("root"), DataType::Int32)
            .unwrap_err();
        assert!(matches!(err, SchemaError::NotASeries { .. }));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = SchemaRegistry::new();
        registry
            .register_series(&path("root.sg.d1.s1"), DataType::Int32)
            .unwrap();
        let err = registry
            .register_series(&path("root.sg.d1.s1"), DataType::Int64)
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateSeries { .. }));
    }
}
