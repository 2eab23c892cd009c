//! # Tabula: columnar datasets for epidemiological analysis
//!
//! A dataset is a named set of typed columns of equal length. Every column
//! keeps its values in a typed store and, depending on its role, an
//! inverted index from distinct value to rows (categorical and ordinal
//! columns) or a word index with positional postings (searchable text).
//! Filters are written as boolean expressions over columns and evaluate to
//! sorted row lists; a filtered view answers the same questions as the
//! dataset it was cut from, in its own row numbering.
//!
//! On disk a dataset is a directory holding one subdirectory per load
//! generation. A bulk load writes the new generation beside the current one
//! and switches over only when every column has been stored, so readers
//! never see a half-written dataset.
//!
//! ## Module Organization
//!
//! * [`common`] - Errors, row-set algebra and shared helpers
//! * [`store`] - Values, datatypes, column roles and typed column arrays
//! * [`text_index`] - Tokenizer, word index, postings and text search
//! * [`dataset`] - Datasets, columns, inverted indexes, filters and views
//! * [`ingest`] - Chunked bulk loading into a new generation
//! * [`crosstab`] - N-dimensional tables over summary datasets
//!
//! ## Example
//!
//! ```
//! use tabula::prelude::*;
//!
//! let mut ds = Dataset::new("patients")?;
//! ds.add_column_from_values(
//!     ColumnDef::new("sex", DataType::Str),
//!     ["M", "F", "M"].map(|s| Some(Value::str(s))),
//! )?;
//! ds.add_column_from_values(
//!     ColumnDef::new("age", DataType::Int).with_coltype(ColType::Scalar),
//!     [40, 25, 61].map(|a| Some(Value::Int(a))),
//! )?;
//!
//! let older_men = ds.filter("sex = 'M' and age > 50")?;
//! assert_eq!(older_men.record_ids(), Some(&[2][..]));
//!
//! let xtab = older_men.crosstab()?;
//! assert_eq!(xtab.shape(), vec![1]);
//! assert_eq!(xtab.get_table("age")?.data.get(&[0]), Some(61.0));
//! # Ok::<(), tabula::common::error::Error>(())
//! ```

pub use tabula_common as common;
pub use tabula_crosstab as crosstab;
pub use tabula_dataset as dataset;
pub use tabula_ingest as ingest;
pub use tabula_store as store;
pub use tabula_text_index as text_index;

/// The types most programs need.
pub mod prelude {
    pub use tabula_common::{Result, RowId};
    pub use tabula_crosstab::{CrossTab, CrossTabAxis, CrossTabExt, MaskedTable};
    pub use tabula_dataset::{
        ColumnDef, ColumnView, Dataset, DatasetView, FilteredDataset, StorageOptions,
    };
    pub use tabula_ingest::{
        DatasetLoad, IngestOptions, Record, RowSource, VecSource, load_source, load_sources,
    };
    pub use tabula_store::{ColType, DataType, Value};
    pub use tabula_text_index::SearchOptions;
}
