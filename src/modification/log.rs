//! Per-file modification log
//!
//! `<datafile>.mods` is the append-only record of delete operations that
//! have not been physically purged from the data file. The file's existence
//! is itself meaningful: it appears with the first appended deletion and
//! signals that at least one delete was redone or pre-existed. A missing
//! log reads as empty, never as an error.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use super::errors::{ModificationError, ModificationResult};
use super::record::Deletion;

/// Suffix appended to a data file path to name its modification log.
pub const MODS_SUFFIX: &str = ".mods";

/// Modification log path for a data file.
pub fn mods_path_for(tsfile_path: &Path) -> PathBuf {
    let mut os = tsfile_path.as_os_str().to_os_string();
    os.push(MODS_SUFFIX);
    PathBuf::from(os)
}

/// Append-only log of [`Deletion`] records for one data file.
#[derive(Debug)]
pub struct ModificationLog {
    /// The log file path
    mods_path: PathBuf,
}

impl ModificationLog {
    /// Binds a log to a data file. Nothing is created until the first
    /// append.
    pub fn new(tsfile_path: &Path) -> Self {
        Self {
            mods_path: mods_path_for(tsfile_path),
        }
    }

    /// The log file path.
    pub fn path(&self) -> &Path {
        &self.mods_path
    }

    /// Whether the log file exists on disk.
    pub fn exists(&self) -> bool {
        self.mods_path.exists()
    }

    /// Appends a deletion record and fsyncs.
    ///
    /// Returns the number of bytes written. The record's payload excludes
    /// its file offset; the offset lives with the in-memory record.
    pub fn append(&mut self, deletion: &Deletion) -> ModificationResult<u64> {
        let serialized = deletion.serialize();

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.mods_path)
            .map_err(|e| ModificationError::Io {
                path: self.mods_path.clone(),
                source: e,
            })?;
        file.write_all(&serialized)
            .and_then(|_| file.sync_all())
            .map_err(|e| ModificationError::Io {
                path: self.mods_path.clone(),
                source: e,
            })?;

        Ok(serialized.len() as u64)
    }

    /// Iterates the log's records in append order.
    ///
    /// A missing log yields an empty iterator. Calling `iter` again
    /// restarts from the first record.
    pub fn iter(&self) -> ModificationResult<ModificationIter> {
        if !self.exists() {
            return Ok(ModificationIter {
                contents: Vec::new(),
                offset: 0,
            });
        }

        let mut file = File::open(&self.mods_path).map_err(|e| ModificationError::Io {
            path: self.mods_path.clone(),
            source: e,
        })?;
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .map_err(|e| ModificationError::Io {
                path: self.mods_path.clone(),
                source: e,
            })?;

        Ok(ModificationIter {
            contents,
            offset: 0,
        })
    }

    /// Reads every record in append order.
    pub fn read_all(&self) -> ModificationResult<Vec<Deletion>> {
        self.iter()?.collect()
    }
}

/// Iterator over a modification log's records.
pub struct ModificationIter {
    contents: Vec<u8>,
    offset: usize,
}

impl Iterator for ModificationIter {
    type Item = ModificationResult<Deletion>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.contents.len() {
            return None;
        }

        match Deletion::deserialize(&self.contents[self.offset..]) {
            Ok((deletion, consumed)) => {
                self.offset += consumed;
                Some(Ok(deletion))
            }
            Err(err) => {
                let at = self.offset as u64;
                // Stop after reporting; a torn record ends the log.
                self.offset = self.contents.len();
                Some(Err(match err {
                    ModificationError::Corrupt { reason, .. } => {
                        ModificationError::Corrupt { offset: at, reason }
                    }
                    other => other,
                }))
            }
        }
    }
}
