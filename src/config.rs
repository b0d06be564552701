//! Engine configuration
//!
//! Loaded from a JSON file. Only `data_dir` is required; everything else
//! has a default. The data directory holds one subdirectory per series
//! group; WAL segments live under the WAL directory, which defaults to
//! `<data_dir>/wal`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory (required)
    pub data_dir: String,

    /// WAL directory (optional, default `<data_dir>/wal`)
    #[serde(default)]
    pub wal_dir: Option<String>,

    /// Schema file listing `series path -> data type` (optional, default
    /// `<data_dir>/schema.json`)
    #[serde(default)]
    pub schema_file: Option<String>,

    /// Rows buffered per file before a flush (optional, default 4096)
    #[serde(default = "default_flush_rows")]
    pub flush_rows: usize,
}

fn default_flush_rows() -> usize {
    4096
}

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON or misses required fields.
    #[error("failed to parse config {path}: {source}")]
    Parse {
        /// Config file path
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// A field value is unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl Config {
    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.is_empty() {
            return Err(ConfigError::Invalid("data_dir must not be empty".into()));
        }
        if self.flush_rows == 0 {
            return Err(ConfigError::Invalid("flush_rows must be positive".into()));
        }
        Ok(())
    }

    /// The data directory.
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }

    /// The WAL directory, defaulted under the data directory.
    pub fn wal_dir(&self) -> PathBuf {
        match &self.wal_dir {
            Some(dir) => PathBuf::from(dir),
            None => self.data_dir().join("wal"),
        }
    }

    /// The schema file, defaulted under the data directory.
    pub fn schema_file(&self) -> PathBuf {
        match &self.schema_file {
            Some(file) => PathBuf::from(file),
            None => self.data_dir().join("schema.json"),
        }
    }
}
