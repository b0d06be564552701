//! CRC32 checksum for WAL records
//!
//! Every WAL record carries a trailing checksum over its length field and
//! body. Replay validates it on every read; any mismatch is corruption.

use crc32fast::Hasher;

/// Computes a CRC32 checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}
