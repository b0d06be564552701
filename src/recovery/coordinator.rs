//! Restart recovery coordinator
//!
//! Drives one recovery performer per unsealed file. Files of one series
//! group recover sequentially in file order; different series groups touch
//! disjoint files and WAL segments, so they recover on parallel threads.
//!
//! Within a group, every recovered file except the last becomes
//! permanently read-only: its index is sealed as soon as its pass
//! finishes. Only the newest file stays open as the group's writable
//! tail.

use std::fs;
use std::path::{Path, PathBuf};

use crate::observability::Logger;
use crate::schema::SchemaProvider;
use crate::wal::{segment_path, WalReader};

use super::errors::{RecoveryError, RecoveryResult};
use super::performer::RecoverPerformer;

/// One unsealed data file awaiting recovery.
#[derive(Debug, Clone)]
pub struct UnsealedFile {
    /// Path of the data file
    pub path: PathBuf,
    /// Identifier of the in-memory table that was writing it
    pub table_id: u64,
}

/// The unsealed files of one series group, oldest first.
#[derive(Debug, Clone)]
pub struct SeriesGroupRecovery {
    /// Series group name (used for reporting)
    pub name: String,
    /// Files in file order; the last one becomes the writable tail
    pub files: Vec<UnsealedFile>,
}

/// Outcome of one file's recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    /// Path of the recovered file
    pub path: PathBuf,
    /// Whether a torn tail was truncated away
    pub had_crashed: bool,
    /// Whether this file is its group's writable tail
    pub writable_tail: bool,
    /// Whether the file is sealed after recovery
    pub sealed: bool,
}

/// Runs recovery across series groups.
pub struct RecoveryCoordinator<'a, S: SchemaProvider> {
    schema: &'a S,
    wal_dir: PathBuf,
}

impl<'a, S: SchemaProvider + Sync> RecoveryCoordinator<'a, S> {
    /// Creates a coordinator over a WAL directory.
    pub fn new(schema: &'a S, wal_dir: &Path) -> Self {
        Self {
            schema,
            wal_dir: wal_dir.to_path_buf(),
        }
    }

    /// Recovers the files of one series group, in order.
    pub fn recover_series_group(
        &self,
        group: &SeriesGroupRecovery,
    ) -> RecoveryResult<Vec<FileStatus>> {
        let mut statuses = Vec::with_capacity(group.files.len());
        let last_index = group.files.len().saturating_sub(1);

        for (index, unsealed) in group.files.iter().enumerate() {
            let mut wal = WalReader::open_segment(&self.wal_dir, unsealed.table_id)
                .map_err(|e| RecoveryError::recovery_failed(e.message().to_string()))?;

            let mut decided_writable = false;
            let performer = RecoverPerformer::new(&unsealed.path, true, unsealed.table_id)
                .recover(self.schema, &mut wal, |p| decided_writable = p.can_write())?;

            let is_tail = index == last_index;
            let had_crashed = performer.has_crashed();

            let sealed = if decided_writable && !is_tail {
                // A recovered file behind the tail never takes appends
                // again; seal it now.
                let mut resource = performer.into_resource();
                resource
                    .close()
                    .map_err(|e| RecoveryError::recovery_failed(e.message().to_string()))?;
                true
            } else {
                !decided_writable
            };

            // The segment is fully applied; retire it so a later restart
            // cannot replay it against a file that has moved on.
            let segment = segment_path(&self.wal_dir, unsealed.table_id);
            if segment.exists() {
                fs::remove_file(&segment).map_err(|e| {
                    RecoveryError::recovery_failed(format!(
                        "failed to retire WAL segment {}: {}",
                        segment.display(),
                        e
                    ))
                })?;
            }

            statuses.push(FileStatus {
                path: unsealed.path.clone(),
                had_crashed,
                writable_tail: decided_writable && is_tail,
                sealed,
            });
        }

        Logger::info(
            "RECOVERY_GROUP_COMPLETE",
            &[
                ("group", &group.name),
                ("files", &group.files.len().to_string()),
            ],
        );
        Ok(statuses)
    }

    /// Recovers every series group, groups in parallel.
    ///
    /// The first failing group's error is returned; other groups still run
    /// to completion on their own threads before this returns.
    pub fn recover_all(&self, groups: &[SeriesGroupRecovery]) -> RecoveryResult<Vec<FileStatus>> {
        std::thread::scope(|scope| {
            let handles: Vec<_> = groups
                .iter()
                .map(|group| scope.spawn(move || self.recover_series_group(group)))
                .collect();

            let mut all = Vec::new();
            let mut first_error = None;
            for handle in handles {
                match handle.join() {
                    Ok(Ok(statuses)) => all.extend(statuses),
                    Ok(Err(e)) => {
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                    Err(_) => {
                        if first_error.is_none() {
                            first_error = Some(RecoveryError::recovery_failed(
                                "series group recovery thread panicked",
                            ));
                        }
                    }
                }
            }

            match first_error {
                Some(e) => Err(e),
                None => Ok(all),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::TimeRangeIndex;
    use crate::schema::{DataType, FieldValue, SchemaRegistry};
    use crate::series::SeriesPath;
    use crate::tsfile::TsFileWriter;
    use tempfile::TempDir;

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new();
        registry
            .register_series(&SeriesPath::new("root.sg.d1.s1").unwrap(), DataType::Int32)
            .unwrap();
        registry
    }

    fn write_valid_file(path: &Path, timestamp: i64) {
        let mut writer = TsFileWriter::create(path).unwrap();
        writer
            .write_value("root.sg.d1", "s1", timestamp, FieldValue::Int32(1))
            .unwrap();
        writer.flush_chunk_groups().unwrap();
    }

    #[test]
    fn test_only_tail_stays_writable() {
        let temp_dir = TempDir::new().unwrap();
        let older = temp_dir.path().join("1.tsd");
        let newer = temp_dir.path().join("2.tsd");
        write_valid_file(&older, 1);
        write_valid_file(&newer, 2);

        let schema = registry();
        let coordinator = RecoveryCoordinator::new(&schema, &temp_dir.path().join("wal"));
        let statuses = coordinator
            .recover_series_group(&SeriesGroupRecovery {
                name: "root.sg".to_string(),
                files: vec![
                    UnsealedFile {
                        path: older.clone(),
                        table_id: 1,
                    },
                    UnsealedFile {
                        path: newer.clone(),
                        table_id: 2,
                    },
                ],
            })
            .unwrap();

        assert_eq!(statuses.len(), 2);
        assert!(!statuses[0].writable_tail);
        assert!(statuses[0].sealed);
        assert!(statuses[1].writable_tail);
        assert!(!statuses[1].sealed);

        // The sealed file's sidecar says so on disk.
        assert!(TimeRangeIndex::load(&older).unwrap().is_closed());
        assert!(!TimeRangeIndex::load(&newer).unwrap().is_closed());
    }

    #[test]
    fn test_groups_recover_independently() {
        let temp_dir = TempDir::new().unwrap();
        let group_dirs: Vec<PathBuf> = (0..3)
            .map(|i| {
                let dir = temp_dir.path().join(format!("sg{}", i));
                std::fs::create_dir_all(&dir).unwrap();
                dir
            })
            .collect();

        let groups: Vec<SeriesGroupRecovery> = group_dirs
            .iter()
            .enumerate()
            .map(|(i, dir)| {
                let file = dir.join("1.tsd");
                write_valid_file(&file, i as i64);
                SeriesGroupRecovery {
                    name: format!("sg{}", i),
                    files: vec![UnsealedFile {
                        path: file,
                        table_id: i as u64,
                    }],
                }
            })
            .collect();

        let schema = registry();
        let coordinator = RecoveryCoordinator::new(&schema, &temp_dir.path().join("wal"));
        let statuses = coordinator.recover_all(&groups).unwrap();

        assert_eq!(statuses.len(), 3);
        assert!(statuses.iter().all(|s| s.writable_tail));
    }

    #[test]
    fn test_failing_group_surfaces_error() {
        let temp_dir = TempDir::new().unwrap();
        let bad = temp_dir.path().join("1.tsd");
        std::fs::write(&bad, b"XXXX\x01\x00garbage").unwrap();

        let schema = registry();
        let coordinator = RecoveryCoordinator::new(&schema, &temp_dir.path().join("wal"));
        let err = coordinator
            .recover_all(&[SeriesGroupRecovery {
                name: "root.sg".to_string(),
                files: vec![UnsealedFile {
                    path: bad,
                    table_id: 1,
                }],
            }])
            .unwrap_err();

        assert_eq!(err.code().code(), "CHRONO_RECOVERY_CORRUPT_FILE");
    }
}
