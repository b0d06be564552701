//! Columnar timeseries data file
//!
//! The physical layer the rest of the engine writes into and recovers: a
//! header plus a sequence of framed, checksummed chunk groups. A file being
//! written ("unsealed") can be torn mid-flush by a crash; the reader's
//! valid-prefix scan tells recovery exactly how much of it to keep.

mod checksum;
mod chunk;
mod errors;
mod reader;
mod writer;

pub use checksum::{compute_checksum, verify_checksum};
pub use chunk::{file_header, ChunkData, ChunkGroup, ChunkMetadata, FORMAT_VERSION, HEADER_LEN, MAGIC};
pub use errors::{Severity, TsFileError, TsFileErrorCode, TsFileResult};
pub use reader::{TsFileReader, ValidPrefix};
pub use writer::TsFileWriter;
