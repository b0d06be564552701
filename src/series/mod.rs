//! Series path model
//!
//! A series path is a dot-separated identifier such as
//! `root.sg.device1.temperature`. The last segment names a measurement and
//! everything before it names the device. A path may also stop at a device
//! (no measurement segment); delete operations use such paths to cover every
//! measurement under the device.
//!
//! Paths are validated strictly on construction: downstream code (the
//! deletion log, WAL replay, the time-range index) assumes a `SeriesPath`
//! is always well formed.

use std::fmt;

use thiserror::Error;

/// Error raised when a series identifier string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The identifier is empty, has an empty segment, or contains a
    /// character outside `[A-Za-z0-9_]`.
    #[error("malformed series path '{path}': {reason}")]
    Malformed {
        /// The offending identifier string
        path: String,
        /// Why it was rejected
        reason: &'static str,
    },
}

impl PathError {
    fn malformed(path: impl Into<String>, reason: &'static str) -> Self {
        PathError::Malformed {
            path: path.into(),
            reason,
        }
    }
}

/// A validated, dot-separated series identifier.
///
/// Equality, ordering and hashing are all on the full string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesPath {
    full: String,
}

impl SeriesPath {
    /// Parses and validates a series path.
    ///
    /// Rules: at least one segment, no empty segments, segment characters
    /// restricted to ASCII alphanumerics and underscore.
    pub fn new(path: impl Into<String>) -> Result<Self, PathError> {
        let full = path.into();

        if full.is_empty() {
            return Err(PathError::malformed(full, "empty path"));
        }

        for segment in full.split('.') {
            if segment.is_empty() {
                return Err(PathError::malformed(full.clone(), "empty segment"));
            }
            if !segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(PathError::malformed(
                    full.clone(),
                    "segment contains an invalid character",
                ));
            }
        }

        Ok(Self { full })
    }

    /// Returns the full dot-separated form.
    pub fn as_str(&self) -> &str {
        &self.full
    }

    /// Number of dot-separated segments.
    pub fn segment_count(&self) -> usize {
        self.full.split('.').count()
    }

    /// Splits into `(device, measurement)`.
    ///
    /// Returns `None` for single-segment paths, which cannot name a
    /// measurement.
    pub fn split(&self) -> Option<(&str, &str)> {
        self.full.rsplit_once('.')
    }

    /// Whether this path covers the series `device`.`measurement`.
    ///
    /// A device-level path covers every measurement under that device; a
    /// full series path covers exactly itself.
    pub fn covers(&self, device: &str, measurement: &str) -> bool {
        if self.full == device {
            return true;
        }
        self.full.len() == device.len() + 1 + measurement.len()
            && self.full.starts_with(device)
            && self.full.as_bytes()[device.len()] == b'.'
            && self.full.ends_with(measurement)
    }
}

impl fmt::Display for SeriesPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        for p in ["root", "root.sg.d1", "root.sg.d1.s1", "a_1.b_2"] {
            assert!(SeriesPath::new(p).is_ok(), "expected '{}' to parse", p);
        }
    }

    #[test]
    fn test_malformed_paths_rejected() {
        for p in ["", ".", "root.", ".root", "root..d1", "root.d 1", "root.d-1"] {
            assert!(
                SeriesPath::new(p).is_err(),
                "expected '{}' to be rejected",
                p
            );
        }
    }

    #[test]
    fn test_split_device_and_measurement() {
        let path = SeriesPath::new("root.sg.d1.s1").unwrap();
        assert_eq!(path.split(), Some(("root.sg.d1", "s1")));

        let device_only = SeriesPath::new("root").unwrap();
        assert_eq!(device_only.split(), None);
    }

    #[test]
    fn test_device_path_covers_all_measurements() {
        let path = SeriesPath::new("root.sg.d2").unwrap();
        assert!(path.covers("root.sg.d2", "s1"));
        assert!(path.covers("root.sg.d2", "s2"));
        assert!(!path.covers("root.sg.d1", "s1"));
    }

    #[test]
    fn test_series_path_covers_only_itself() {
        let path = SeriesPath::new("root.sg.d2.s1").unwrap();
        assert!(path.covers("root.sg.d2", "s1"));
        assert!(!path.covers("root.sg.d2", "s2"));
        assert!(!path.covers("root.sg.d2.s1", "s1"));
    }

    #[test]
    fn test_display_roundtrip() {
        let path = SeriesPath::new("root.sg.d1.s1").unwrap();
        assert_eq!(path.to_string(), "root.sg.d1.s1");
        assert_eq!(SeriesPath::new(path.to_string()).unwrap(), path);
    }
}
