//! CLI command implementations
//!
//! Each command prints a single JSON object to stdout. Timestamps are
//! echoed both raw (milliseconds) and rendered as UTC datetimes where they
//! fit the calendar; open-ended bounds such as `i64::MIN` stay raw.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::config::Config;
use crate::modification::ModificationLog;
use crate::recovery::{RecoveryCoordinator, SeriesGroupRecovery, UnsealedFile};
use crate::schema::{DataType, SchemaRegistry};
use crate::series::SeriesPath;
use crate::tsfile::TsFileReader;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};

/// Parses arguments and dispatches to the selected command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    match cli.command {
        Command::Inspect { file } => inspect(&file),
        Command::Mods { file } => mods(&file),
        Command::Recover { config } => recover(&config),
    }
}

fn render_time(millis: i64) -> Value {
    match DateTime::<Utc>::from_timestamp_millis(millis) {
        Some(datetime) => json!({ "millis": millis, "utc": datetime.to_rfc3339() }),
        None => json!({ "millis": millis }),
    }
}

fn inspect(file: &Path) -> CliResult<()> {
    let mut reader = TsFileReader::open(file).map_err(|e| CliError::command(e.to_string()))?;
    let chunks: Vec<Value> = reader
        .all_chunk_metadata()
        .map_err(|e| CliError::command(e.to_string()))?
        .iter()
        .map(|m| {
            json!({
                "device": m.device,
                "measurement": m.measurement,
                "data_type": m.data_type.type_name(),
                "points": m.point_count,
                "start": render_time(m.start_time),
                "end": render_time(m.end_time),
                "group_offset": m.group_offset,
            })
        })
        .collect();

    let response = json!({
        "status": "ok",
        "file": file.display().to_string(),
        "size_bytes": reader.file_size(),
        "chunks": chunks,
    });
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn mods(file: &Path) -> CliResult<()> {
    let log = ModificationLog::new(file);
    let records: Vec<Value> = log
        .read_all()
        .map_err(|e| CliError::command(e.to_string()))?
        .iter()
        .map(|d| {
            json!({
                "path": d.path().as_str(),
                "start": render_time(d.start_time()),
                "end": render_time(d.end_time()),
            })
        })
        .collect();

    let response = json!({
        "status": "ok",
        "log": log.path().display().to_string(),
        "exists": log.exists(),
        "deletions": records,
    });
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Loads the schema file: a JSON object mapping series paths to type
/// names. A missing file yields an empty registry (replaying inserts will
/// then fail loudly rather than guess types).
fn load_schema(path: &Path) -> CliResult<SchemaRegistry> {
    let mut registry = SchemaRegistry::new();
    if !path.exists() {
        return Ok(registry);
    }

    let contents = fs::read_to_string(path)?;
    let series: HashMap<String, DataType> = serde_json::from_str(&contents)?;
    for (path_string, data_type) in series {
        let series_path =
            SeriesPath::new(path_string).map_err(|e| CliError::command(e.to_string()))?;
        registry
            .register_series(&series_path, data_type)
            .map_err(|e| CliError::command(e.to_string()))?;
    }
    Ok(registry)
}

/// Collects a series group's data files, oldest first by numeric file
/// stem. The stem doubles as the owning table's identifier.
fn collect_group(dir: &Path) -> CliResult<Vec<UnsealedFile>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("tsd") {
            continue;
        }
        let table_id = match path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<u64>().ok())
        {
            Some(id) => id,
            None => {
                return Err(CliError::command(format!(
                    "data file {} has no numeric stem",
                    path.display()
                )))
            }
        };
        files.push(UnsealedFile { path, table_id });
    }
    files.sort_by_key(|f| f.table_id);
    Ok(files)
}

fn recover(config_path: &Path) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let schema = load_schema(&config.schema_file())?;

    let mut groups = Vec::new();
    for entry in fs::read_dir(config.data_dir())? {
        let path = entry?.path();
        if !path.is_dir() || path == config.wal_dir() {
            continue;
        }
        let files = collect_group(&path)?;
        if files.is_empty() {
            continue;
        }
        groups.push(SeriesGroupRecovery {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            files,
        });
    }

    let coordinator = RecoveryCoordinator::new(&schema, &config.wal_dir());
    let statuses = coordinator
        .recover_all(&groups)
        .map_err(|e| CliError::command(e.to_string()))?;

    let report: Vec<Value> = statuses
        .iter()
        .map(|s| {
            json!({
                "file": s.path.display().to_string(),
                "had_crashed": s.had_crashed,
                "writable_tail": s.writable_tail,
                "sealed": s.sealed,
            })
        })
        .collect();

    let response = json!({
        "status": "ok",
        "groups": groups.len(),
        "files": report,
    });
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaProvider;
    use tempfile::TempDir;

    #[test]
    fn test_load_schema_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let registry = load_schema(&temp_dir.path().join("schema.json")).unwrap();
        assert_eq!(registry.series_count(), 0);
    }

    #[test]
    fn test_load_schema_registers_series() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("schema.json");
        fs::write(
            &path,
            r#"{"root.sg.d1.s1": "int32", "root.sg.d2.s1": "float"}"#,
        )
        .unwrap();

        let registry = load_schema(&path).unwrap();
        assert_eq!(registry.series_count(), 2);
        assert_eq!(
            registry.data_type("root.sg.d1", "s1"),
            Some(DataType::Int32)
        );
    }

    #[test]
    fn test_collect_group_orders_by_stem() {
        let temp_dir = TempDir::new().unwrap();
        for name in ["10.tsd", "2.tsd", "notes.txt"] {
            fs::write(temp_dir.path().join(name), b"").unwrap();
        }

        let files = collect_group(temp_dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].table_id, 2);
        assert_eq!(files[1].table_id, 10);
    }

    #[test]
    fn test_collect_group_rejects_unnumbered_data_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("tail.tsd"), b"").unwrap();
        assert!(collect_group(temp_dir.path()).is_err());
    }
}
