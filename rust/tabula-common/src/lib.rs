//! Core definitions relied upon by all tabula-* crates: the error taxonomy,
//! the crate-wide `Result` alias, argument verification macros and identifier
//! validation for dataset, column and filter names, and sorted row-id set
//! algebra.

pub mod error;
pub mod macros;
pub mod names;
pub mod result;
pub mod rowset;

pub use result::Result;

/// Row ordinal within a dataset. Postings files store these as 32-bit values,
/// so the whole engine uses the same width.
pub type RowId = u32;
