//! Bulk load tuning.

use serde::{Deserialize, Serialize};

/// Rows buffered per column before a chunk is spilled.
pub const DEFAULT_CHUNK_ROWS: usize = 1_000_000;

/// zstd level for chunk files.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    /// Rows per spilled chunk. `0` keeps every row in memory and spills
    /// once, when the source ends.
    pub chunk_rows: usize,
    /// Stop after this many records.
    pub row_limit: Option<usize>,
    /// Columns finalized concurrently. `1` finalizes them one after another
    /// on the calling thread.
    pub workers: usize,
    pub compression_level: i32,
}

impl Default for IngestOptions {
    fn default() -> Self {
        IngestOptions {
            chunk_rows: DEFAULT_CHUNK_ROWS,
            row_limit: None,
            workers: 1,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl IngestOptions {
    pub fn with_chunk_rows(mut self, chunk_rows: usize) -> Self {
        self.chunk_rows = chunk_rows;
        self
    }

    pub fn with_row_limit(mut self, row_limit: usize) -> Self {
        self.row_limit = Some(row_limit);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }
}
