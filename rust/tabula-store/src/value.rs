//! Dynamically typed cell values.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// A single non-null cell value.
///
/// `Value` is totally ordered and hashable (floats via [`OrderedFloat`]) so it can
/// key inverted indexes and crosstab axes directly. The derived ordering compares
/// the variant first; [`Value::compare`] gives the cross-variant numeric and
/// temporal comparison filters need.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Tuple(Vec<Value>),
}

impl Value {
    pub fn float(v: f64) -> Value {
        Value::Float(OrderedFloat(v))
    }

    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(s.into())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(v.0),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::Tuple(_) => "tuple",
        }
    }

    /// Compares two values across compatible variants.
    ///
    /// Integers and floats compare numerically, dates compare with datetimes at
    /// midnight, and tuples compare element-wise. Returns `None` for
    /// incomparable pairs such as a string against a number.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Float(b)) => Some(OrderedFloat(*a as f64).cmp(b)),
            (Value::Float(a), Value::Int(b)) => Some(a.cmp(&OrderedFloat(*b as f64))),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Date(a), Value::DateTime(b)) => Some(midnight(*a).cmp(b)),
            (Value::DateTime(a), Value::Date(b)) => Some(a.cmp(&midnight(*b))),
            (Value::Tuple(a), Value::Tuple(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        ord => return Some(ord),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            _ => None,
        }
    }

    /// Equality under [`Value::compare`] semantics (`1 == 1.0`).
    pub fn loosely_equals(&self, other: &Value) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Rendering used in diagnostics: strings are quoted, everything else is
    /// displayed as is.
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("'{s}'"),
            other => other.to_string(),
        }
    }
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{}", v.0),
            Value::Str(s) => f.write_str(s),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item.repr())?;
                }
                f.write_str(")")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::float(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveTime> for Value {
    fn from(t: NaiveTime) -> Self {
        Value::Time(t)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Tuple(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_numeric_compare() {
        assert_eq!(Value::Int(2).compare(&Value::float(2.5)), Some(Ordering::Less));
        assert!(Value::Int(3).loosely_equals(&Value::float(3.0)));
        assert_eq!(Value::str("a").compare(&Value::Int(1)), None);
    }

    #[test]
    fn test_date_datetime_compare() {
        let d = NaiveDate::from_ymd_opt(2004, 3, 1).unwrap();
        let dt = d.and_hms_opt(12, 0, 0).unwrap();
        assert_eq!(Value::Date(d).compare(&Value::DateTime(dt)), Some(Ordering::Less));
    }

    #[test]
    fn test_display() {
        let t = Value::Tuple(vec![Value::str("a"), Value::Int(2)]);
        assert_eq!(t.to_string(), "('a', 2)");
        assert_eq!(Value::str("x").repr(), "'x'");
    }
}
