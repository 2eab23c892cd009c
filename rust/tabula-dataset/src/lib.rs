//! Datasets: named, versioned collections of typed columns with inverted
//! indexes, a filter language evaluated to row sets, saved filters and
//! filtered views.
//!
//! ```rust
//! use tabula_dataset::{ColumnDef, Dataset, DatasetView};
//! use tabula_store::{DataType, Value};
//!
//! let mut ds = Dataset::new("patients").unwrap();
//! let sex = ["M", "F", "M"].map(|s| Some(Value::str(s)));
//! ds.add_column_from_values(ColumnDef::new("sex", DataType::Str), sex).unwrap();
//!
//! let males = ds.filter("sex = 'M'").unwrap();
//! assert_eq!(males.ids().as_slice(), &[0, 2]);
//! ```

pub mod column;
pub mod config;
pub mod dataset;
pub mod filter;
pub mod inverted;
pub mod lock;
pub mod registry;
pub mod view;

pub use column::{Column, ColumnDef, ROW_ORDINAL, gather_multisource};
pub use config::StorageOptions;
pub use dataset::{Dataset, DatasetDescription, DatasetMeta};
pub use filter::{FilterExpr, Operator, parse_filter};
pub use inverted::InvertedIndex;
pub use registry::{DatasetFilter, FilterMeta};
pub use view::{ColumnView, DatasetView, FilteredDataset};
