//! Sources of row records.

use std::collections::BTreeMap;

use tabula_common::Result;
use tabula_store::{DataType, Value};

/// One source row: column name to value. Absent columns are null.
pub type Record = BTreeMap<String, Value>;

/// A reader handing records to the bulk loader.
///
/// A source declares the datatype of every column it produces before the
/// first record is read, so mismatches with the dataset's column
/// definitions are caught before anything is stored.
pub trait RowSource {
    fn name(&self) -> &str;

    /// Declared `(column, datatype)` pairs.
    fn columns(&self) -> &[(String, DataType)];

    /// The records, in row order.
    fn records(&mut self) -> Box<dyn Iterator<Item = Result<Record>> + '_>;
}

/// Records held in memory.
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    name: String,
    columns: Vec<(String, DataType)>,
    records: Vec<Record>,
}

impl VecSource {
    pub fn new(name: impl Into<String>, columns: Vec<(String, DataType)>, records: Vec<Record>) -> VecSource {
        VecSource {
            name: name.into(),
            columns,
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RowSource for VecSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn columns(&self) -> &[(String, DataType)] {
        &self.columns
    }

    fn records(&mut self) -> Box<dyn Iterator<Item = Result<Record>> + '_> {
        Box::new(self.records.iter().cloned().map(Ok))
    }
}
