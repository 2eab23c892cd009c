//! Value to row-id mappings for discrete columns.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tabula_common::{RowId, Result, rowset};
use tabula_store::{Value, ValueArray, persist};

/// Extension of persisted inverted index files.
pub const INDEX_EXTENSION: &str = "invindex";

/// Maps every distinct non-null value of a column to the sorted rows holding
/// it. A tuple row is listed once under each distinct element it contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvertedIndex {
    entries: BTreeMap<Value, Vec<RowId>>,
}

impl InvertedIndex {
    pub fn new() -> InvertedIndex {
        InvertedIndex::default()
    }

    /// Builds the index from a finished column array.
    pub fn build(array: &ValueArray) -> InvertedIndex {
        let mut builder = InvertedIndexBuilder::new();
        for row in 0..array.len() {
            builder.push_row(row as RowId, array.row_values(row));
        }
        builder.finish()
    }

    pub fn get(&self, value: &Value) -> &[RowId] {
        self.entries.get(value).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Distinct values in ascending order.
    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &[RowId])> {
        self.entries.iter().map(|(v, rows)| (v, rows.as_slice()))
    }

    /// Number of distinct values.
    pub fn cardinality(&self) -> usize {
        self.entries.len()
    }

    /// Total number of (row, value) pairs.
    pub fn pair_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Union of the rows of every key accepted by `pred`. Cost follows the
    /// number of distinct values, not the number of rows.
    pub fn rows_matching<F>(&self, mut pred: F) -> Vec<RowId>
    where
        F: FnMut(&Value) -> bool,
    {
        let matched: Vec<&[RowId]> = self
            .entries
            .iter()
            .filter(|(value, _)| pred(value))
            .map(|(_, rows)| rows.as_slice())
            .collect();
        match matched.len() {
            0 => Vec::new(),
            1 => matched[0].to_vec(),
            _ => rowset::union_all(matched),
        }
    }

    /// Restricts the index to `selection` (sorted parent rows) and renumbers
    /// rows to their positions within it. Values left without rows are
    /// dropped.
    pub fn localize(&self, selection: &[RowId]) -> InvertedIndex {
        let entries = self
            .entries
            .iter()
            .filter_map(|(value, rows)| {
                let local = rowset::localize(rows, selection);
                (!local.is_empty()).then(|| (value.clone(), local))
            })
            .collect();
        InvertedIndex { entries }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        persist::write_blob(path, self)
    }

    pub fn load(path: &Path) -> Result<InvertedIndex> {
        persist::read_blob(path)
    }
}

/// Accumulates an index from rows delivered in increasing order.
#[derive(Debug, Default)]
pub struct InvertedIndexBuilder {
    entries: BTreeMap<Value, Vec<RowId>>,
}

impl InvertedIndexBuilder {
    pub fn new() -> InvertedIndexBuilder {
        InvertedIndexBuilder::default()
    }

    /// Records the distinct `values` of one row.
    pub fn push_row(&mut self, row: RowId, values: impl IntoIterator<Item = Value>) {
        for value in values {
            let rows = self.entries.entry(value).or_default();
            if rows.last() != Some(&row) {
                rows.push(row);
            }
        }
    }

    pub fn finish(self) -> InvertedIndex {
        InvertedIndex {
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_store::DataType;
    use tempfile::TempDir;

    fn strs(values: &[&str]) -> ValueArray {
        let mut b = DataType::Str.get_array(values.len());
        for v in values {
            b.push(Some(Value::str(*v))).unwrap();
        }
        b.finish()
    }

    #[test]
    fn test_build_categorical() {
        let idx = InvertedIndex::build(&strs(&["M", "F", "M", "M", "F"]));
        assert_eq!(idx.get(&Value::str("M")), &[0, 2, 3]);
        assert_eq!(idx.get(&Value::str("F")), &[1, 4]);
        assert!(idx.get(&Value::str("X")).is_empty());
        assert_eq!(idx.pair_count(), 5);
    }

    #[test]
    fn test_tuple_rows_listed_once_per_value() {
        let mut b = DataType::Tuple.get_array(3);
        b.push(Some(Value::Tuple(vec![Value::str("a"), Value::str("b"), Value::str("a")])))
            .unwrap();
        b.push(None).unwrap();
        b.push(Some(Value::str("b"))).unwrap();
        let idx = InvertedIndex::build(&b.finish());
        assert_eq!(idx.get(&Value::str("a")), &[0]);
        assert_eq!(idx.get(&Value::str("b")), &[0, 2]);
        assert_eq!(idx.cardinality(), 2);
    }

    #[test]
    fn test_rows_matching_and_localize() {
        let idx = InvertedIndex::build(&strs(&["a", "b", "c", "a", "b"]));
        let rows = idx.rows_matching(|v| v.as_str() != Some("c"));
        assert_eq!(rows, vec![0, 1, 3, 4]);

        let local = idx.localize(&[1, 2, 4]);
        assert_eq!(local.get(&Value::str("b")), &[0, 2]);
        assert_eq!(local.get(&Value::str("c")), &[1]);
        assert!(local.get(&Value::str("a")).is_empty());
        assert_eq!(local.cardinality(), 2);
    }

    #[test]
    fn test_save_load() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join(format!("index.{INDEX_EXTENSION}"));
        let idx = InvertedIndex::build(&strs(&["x", "y", "x"]));
        idx.save(&path).unwrap();
        assert_eq!(InvertedIndex::load(&path).unwrap(), idx);
    }
}
