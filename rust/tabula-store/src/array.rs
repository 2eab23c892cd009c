//! Typed column arrays.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tabula_common::RowId;

use crate::datatype::DataType;
use crate::value::Value;

/// The stored contents of one column: one slot per row, each either a value
/// or null.
///
/// Numeric arrays keep a dense value vector and an optional null mask
/// (`true` = masked); the mask is dropped entirely when no row is null.
/// Recode arrays store a `u32` code per row into a dictionary of distinct
/// values, with code 0 reserved for null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueArray {
    Int {
        values: Vec<i64>,
        mask: Option<Vec<bool>>,
    },
    Float {
        values: Vec<f64>,
        mask: Option<Vec<bool>>,
    },
    Str(Vec<Option<String>>),
    Tuple(Vec<Vec<Value>>),
    Recode {
        codes: Vec<u32>,
        dictionary: Vec<Value>,
    },
    Date(Vec<Option<NaiveDate>>),
    Time(Vec<Option<NaiveTime>>),
    DateTime(Vec<Option<NaiveDateTime>>),
}

impl ValueArray {
    /// An array with no rows, shaped for `datatype`.
    pub fn empty(datatype: DataType) -> ValueArray {
        match datatype {
            DataType::Int | DataType::Long => ValueArray::Int {
                values: Vec::new(),
                mask: None,
            },
            DataType::Float => ValueArray::Float {
                values: Vec::new(),
                mask: None,
            },
            DataType::Str => ValueArray::Str(Vec::new()),
            DataType::Tuple => ValueArray::Tuple(Vec::new()),
            DataType::Recode | DataType::RecodeDate => ValueArray::Recode {
                codes: Vec::new(),
                dictionary: Vec::new(),
            },
            DataType::Date => ValueArray::Date(Vec::new()),
            DataType::Time => ValueArray::Time(Vec::new()),
            DataType::DateTime => ValueArray::DateTime(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ValueArray::Int { values, .. } => values.len(),
            ValueArray::Float { values, .. } => values.len(),
            ValueArray::Str(v) => v.len(),
            ValueArray::Tuple(v) => v.len(),
            ValueArray::Recode { codes, .. } => codes.len(),
            ValueArray::Date(v) => v.len(),
            ValueArray::Time(v) => v.len(),
            ValueArray::DateTime(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether row `i` holds no value. An empty tuple counts as null.
    pub fn is_null(&self, i: usize) -> bool {
        match self {
            ValueArray::Int { mask, .. } | ValueArray::Float { mask, .. } => {
                mask.as_ref().is_some_and(|m| m[i])
            }
            ValueArray::Str(v) => v[i].is_none(),
            ValueArray::Tuple(v) => v[i].is_empty(),
            ValueArray::Recode { codes, .. } => codes[i] == 0,
            ValueArray::Date(v) => v[i].is_none(),
            ValueArray::Time(v) => v[i].is_none(),
            ValueArray::DateTime(v) => v[i].is_none(),
        }
    }

    /// Returns the value at row `i`, or `None` for a null.
    ///
    /// Tuple rows always return `Some(Value::Tuple(..))`, possibly empty.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of bounds.
    pub fn get(&self, i: usize) -> Option<Value> {
        match self {
            ValueArray::Int { values, mask } => {
                (!mask.as_ref().is_some_and(|m| m[i])).then(|| Value::Int(values[i]))
            }
            ValueArray::Float { values, mask } => {
                (!mask.as_ref().is_some_and(|m| m[i])).then(|| Value::float(values[i]))
            }
            ValueArray::Str(v) => v[i].clone().map(Value::Str),
            ValueArray::Tuple(v) => Some(Value::Tuple(v[i].clone())),
            ValueArray::Recode { codes, dictionary } => match codes[i] {
                0 => None,
                code => dictionary.get(code as usize - 1).cloned(),
            },
            ValueArray::Date(v) => v[i].map(Value::Date),
            ValueArray::Time(v) => v[i].map(Value::Time),
            ValueArray::DateTime(v) => v[i].map(Value::DateTime),
        }
    }

    /// Numeric view of row `i`, `None` when null or not numeric.
    pub fn get_f64(&self, i: usize) -> Option<f64> {
        match self {
            ValueArray::Int { values, mask } => {
                (!mask.as_ref().is_some_and(|m| m[i])).then(|| values[i] as f64)
            }
            ValueArray::Float { values, mask } => {
                (!mask.as_ref().is_some_and(|m| m[i])).then(|| values[i])
            }
            _ => self.get(i).and_then(|v| v.as_f64()),
        }
    }

    /// The distinct values contained in row `i`: the elements of a tuple row
    /// (sorted, de-duplicated), the value itself for scalar rows, nothing for
    /// nulls.
    pub fn row_values(&self, i: usize) -> Vec<Value> {
        match self {
            ValueArray::Tuple(v) => {
                let mut items = v[i].clone();
                items.sort();
                items.dedup();
                items
            }
            _ => self.get(i).into_iter().collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<Value>> + '_ {
        (0..self.len()).map(move |i| self.get(i))
    }

    /// Gathers the given rows into a new array of the same type.
    ///
    /// # Panics
    ///
    /// Panics if any row id is out of bounds.
    pub fn take(&self, rows: &[RowId]) -> ValueArray {
        fn gather<T: Clone>(src: &[T], rows: &[RowId]) -> Vec<T> {
            rows.iter().map(|&r| src[r as usize].clone()).collect()
        }
        fn gather_mask(mask: &Option<Vec<bool>>, rows: &[RowId]) -> Option<Vec<bool>> {
            mask.as_ref()
                .map(|m| gather(m, rows))
                .filter(|m| m.iter().any(|&masked| masked))
        }
        match self {
            ValueArray::Int { values, mask } => ValueArray::Int {
                values: gather(values, rows),
                mask: gather_mask(mask, rows),
            },
            ValueArray::Float { values, mask } => ValueArray::Float {
                values: gather(values, rows),
                mask: gather_mask(mask, rows),
            },
            ValueArray::Str(v) => ValueArray::Str(gather(v, rows)),
            ValueArray::Tuple(v) => ValueArray::Tuple(gather(v, rows)),
            ValueArray::Recode { codes, dictionary } => ValueArray::Recode {
                codes: gather(codes, rows),
                dictionary: dictionary.clone(),
            },
            ValueArray::Date(v) => ValueArray::Date(gather(v, rows)),
            ValueArray::Time(v) => ValueArray::Time(gather(v, rows)),
            ValueArray::DateTime(v) => ValueArray::DateTime(gather(v, rows)),
        }
    }

    /// Largest absolute value of a numeric array, ignoring nulls.
    pub fn max_abs(&self) -> Option<f64> {
        (0..self.len())
            .filter_map(|i| self.get_f64(i))
            .map(f64::abs)
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
    }

    pub fn null_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_null(i)).count()
    }
}
