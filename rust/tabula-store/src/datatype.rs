//! Column datatypes and their per-type defaults.

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tabula_common::{Result, error::Error};

use crate::builder::ArrayBuilder;
use crate::coltype::ColType;
use crate::value::Value;

/// The primitive kind of value a column stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Int,
    Long,
    Float,
    Str,
    Tuple,
    Recode,
    Date,
    Time,
    DateTime,
    RecodeDate,
}

impl DataType {
    pub const ALL: [DataType; 10] = [
        DataType::Int,
        DataType::Long,
        DataType::Float,
        DataType::Str,
        DataType::Tuple,
        DataType::Recode,
        DataType::Date,
        DataType::Time,
        DataType::DateTime,
        DataType::RecodeDate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DataType::Int => "int",
            DataType::Long => "long",
            DataType::Float => "float",
            DataType::Str => "str",
            DataType::Tuple => "tuple",
            DataType::Recode => "recode",
            DataType::Date => "date",
            DataType::Time => "time",
            DataType::DateTime => "datetime",
            DataType::RecodeDate => "recodedate",
        }
    }

    /// Role given to a column of this type when none is specified.
    pub fn default_coltype(&self) -> ColType {
        match self {
            DataType::Float | DataType::DateTime => ColType::Scalar,
            DataType::Date | DataType::Time | DataType::RecodeDate => ColType::Ordinal,
            _ => ColType::Categorical,
        }
    }

    pub fn default_format_str(&self) -> &'static str {
        match self {
            DataType::Int | DataType::Long => "%d",
            DataType::Float => "%10.10g",
            DataType::Date | DataType::RecodeDate => "%Y-%m-%d",
            DataType::Time => "%H:%M:%S",
            DataType::DateTime => "%Y-%m-%d %H:%M:%S",
            _ => "%s",
        }
    }

    /// Value standing for "all categories" in summaries.
    pub fn default_all_value(&self) -> Value {
        match self {
            DataType::Int | DataType::Long => Value::Int(-(i32::MAX as i64)),
            DataType::Float => Value::float(-(i32::MAX as f64)),
            DataType::Date | DataType::RecodeDate => Value::Date(NaiveDate::MIN),
            DataType::Time => Value::Time(NaiveTime::MIN),
            DataType::DateTime => Value::DateTime(NaiveDate::MIN.and_time(NaiveTime::MIN)),
            _ => Value::str("_all_"),
        }
    }

    /// Value stored in place of a null for types that mask their nulls.
    pub fn masked_value(&self) -> Option<Value> {
        match self {
            DataType::Int | DataType::Long => Some(Value::Int(0)),
            DataType::Float => Some(Value::float(0.0)),
            DataType::Str => Some(Value::str("")),
            DataType::Tuple => Some(Value::Tuple(Vec::new())),
            _ => None,
        }
    }

    /// Extension of the persisted data file.
    pub fn file_extension(&self) -> &'static str {
        match self {
            DataType::Int | DataType::Long => "intarray",
            DataType::Float => "floatarray",
            DataType::Str => "strarray",
            DataType::Tuple => "tuplearray",
            DataType::Recode | DataType::RecodeDate => "recodearray",
            DataType::Date => "datearray",
            DataType::Time => "timearray",
            DataType::DateTime => "datetimearray",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int | DataType::Long | DataType::Float)
    }

    pub fn is_datetime(&self) -> bool {
        matches!(
            self,
            DataType::Date | DataType::Time | DataType::DateTime | DataType::RecodeDate
        )
    }

    pub fn is_multivalue(&self) -> bool {
        *self == DataType::Tuple
    }

    pub fn is_recode(&self) -> bool {
        matches!(self, DataType::Recode | DataType::RecodeDate)
    }

    /// Returns an empty builder for `capacity` rows of this type.
    pub fn get_array(&self, capacity: usize) -> ArrayBuilder {
        ArrayBuilder::with_capacity(*self, capacity)
    }

    /// Converts a filter literal to this type where a lossless conversion
    /// exists (an integer against a float column, a date against a datetime
    /// column). Other values are returned unchanged.
    pub fn coerce_literal(&self, value: Value) -> Value {
        match (self, value) {
            (DataType::Float, Value::Int(v)) => Value::float(v as f64),
            (DataType::DateTime, Value::Date(d)) => Value::DateTime(d.and_time(NaiveTime::MIN)),
            (DataType::Date | DataType::RecodeDate, Value::DateTime(dt)) => {
                if dt.time() == NaiveTime::MIN {
                    Value::Date(dt.date())
                } else {
                    Value::DateTime(dt)
                }
            }
            (_, other) => other,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DataType::ALL
            .iter()
            .find(|dt| dt.name() == s)
            .copied()
            .ok_or_else(|| Error::invalid_arg("datatype", format!("unknown datatype '{s}'")))
    }
}
