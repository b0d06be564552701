//! chronodb - a strict, crash-safe time-series storage engine core
//!
//! Data lives in sealed, append-only columnar files; the file currently
//! being written can be torn by a crash mid-flush. This crate implements
//! the machinery that makes that safe: the data file format and its
//! per-device time-range index, the write-ahead log, the per-file
//! deletion log, and the restart recovery that reconciles all three.

pub mod cli;
pub mod config;
pub mod memtable;
pub mod modification;
pub mod observability;
pub mod recovery;
pub mod resource;
pub mod schema;
pub mod series;
pub mod tsfile;
pub mod wal;
