//! Bulk loading of row-oriented records into dataset columns.
//!
//! Records are buffered per column and spilled to compressed chunk files
//! every [`IngestOptions::chunk_rows`] rows, which bounds memory for large
//! sources. When the source ends, each column's chunks are read back in
//! order and run through the column store chain, optionally on a pool of
//! workers with one task per column. The new generation is installed only
//! after every column has been stored.

pub mod chunk;
pub mod loader;
pub mod options;
pub mod source;

pub use loader::{BulkLoader, DatasetLoad, LoadState, LoadSummary, load_source, load_sources};
pub use options::IngestOptions;
pub use source::{Record, RowSource, VecSource};
