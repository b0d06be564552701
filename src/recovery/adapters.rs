//! Adapters binding storage-layer types to the recovery traits

use crate::wal::WalReader;

use super::errors::{RecoveryError, RecoveryResult};
use super::redo::WalRead;

impl WalRead for WalReader {
    fn read_next(&mut self) -> RecoveryResult<Option<crate::wal::WalEntry>> {
        let offset = self.current_offset();
        WalReader::read_next(self)
            .map_err(|e| RecoveryError::wal_corruption(offset, e.message().to_string()))
    }
}
