use ahash::AHashMap;
use chrono::NaiveTime;

use crate::array::ValueArray;
use crate::datatype::DataType;
use crate::value::Value;

/// Accumulates row values into a [`ValueArray`] of a fixed datatype.
///
/// Obtained from [`DataType::get_array`]. Each pushed value is checked against
/// the datatype; a value that cannot be stored is handed back to the caller,
/// which owns the column/row context needed to report it.
pub struct ArrayBuilder {
    datatype: DataType,
    array: ValueArray,
    any_masked: bool,
    mask: Vec<bool>,
    recode_map: AHashMap<Value, u32>,
}

impl ArrayBuilder {
    pub fn with_capacity(datatype: DataType, capacity: usize) -> ArrayBuilder {
        let array = match datatype {
            DataType::Int | DataType::Long => ValueArray::Int {
                values: Vec::with_capacity(capacity),
                mask: None,
            },
            DataType::Float => ValueArray::Float {
                values: Vec::with_capacity(capacity),
                mask: None,
            },
            DataType::Str => ValueArray::Str(Vec::with_capacity(capacity)),
            DataType::Tuple => ValueArray::Tuple(Vec::with_capacity(capacity)),
            DataType::Recode | DataType::RecodeDate => ValueArray::Recode {
                codes: Vec::with_capacity(capacity),
                dictionary: Vec::new(),
            },
            DataType::Date => ValueArray::Date(Vec::with_capacity(capacity)),
            DataType::Time => ValueArray::Time(Vec::with_capacity(capacity)),
            DataType::DateTime => ValueArray::DateTime(Vec::with_capacity(capacity)),
        };
        let mask = if datatype.is_numeric() {
            Vec::with_capacity(capacity)
        } else {
            Vec::new()
        };
        ArrayBuilder {
            datatype,
            array,
            any_masked: false,
            mask,
            recode_map: AHashMap::new(),
        }
    }

    pub fn datatype(&self) -> DataType {
        self.datatype
    }

    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends one row. Returns the value back as `Err` when its runtime type
    /// is incompatible with the builder's datatype; the builder is unchanged
    /// in that case.
    pub fn push(&mut self, value: Option<Value>) -> std::result::Result<(), Value> {
        let datatype = self.datatype;
        match &mut self.array {
            ValueArray::Int { values, .. } => {
                let v = match value {
                    None => None,
                    Some(Value::Int(v)) => Some(v),
                    Some(other) => return Err(other),
                };
                values.push(v.unwrap_or(0));
                self.push_mask(v.is_none());
            }
            ValueArray::Float { values, .. } => {
                let v = match value {
                    None => None,
                    Some(Value::Float(v)) => Some(v.0),
                    Some(Value::Int(v)) => Some(v as f64),
                    Some(other) => return Err(other),
                };
                values.push(v.unwrap_or(0.0));
                self.push_mask(v.is_none());
            }
            ValueArray::Str(values) => match value {
                None => values.push(None),
                Some(Value::Str(s)) => values.push(Some(s)),
                Some(other) => return Err(other),
            },
            ValueArray::Tuple(values) => match value {
                None => values.push(Vec::new()),
                Some(Value::Tuple(items)) => values.push(items),
                Some(single) => values.push(vec![single]),
            },
            ValueArray::Recode { codes, dictionary } => match value {
                None => codes.push(0),
                Some(v) => {
                    if datatype == DataType::RecodeDate && !matches!(v, Value::Date(_)) {
                        return Err(v);
                    }
                    let next = dictionary.len() as u32 + 1;
                    let code = *self.recode_map.entry(v.clone()).or_insert_with(|| {
                        dictionary.push(v);
                        next
                    });
                    codes.push(code);
                }
            },
            ValueArray::Date(values) => match value {
                None => values.push(None),
                Some(Value::Date(d)) => values.push(Some(d)),
                Some(other) => return Err(other),
            },
            ValueArray::Time(values) => match value {
                None => values.push(None),
                Some(Value::Time(t)) => values.push(Some(t)),
                Some(other) => return Err(other),
            },
            ValueArray::DateTime(values) => match value {
                None => values.push(None),
                Some(Value::DateTime(dt)) => values.push(Some(dt)),
                Some(Value::Date(d)) => values.push(Some(d.and_time(NaiveTime::MIN))),
                Some(other) => return Err(other),
            },
        }
        Ok(())
    }

    fn push_mask(&mut self, masked: bool) {
        self.any_masked |= masked;
        self.mask.push(masked);
    }

    pub fn finish(self) -> ValueArray {
        let mask = self.any_masked.then_some(self.mask);
        match self.array {
            ValueArray::Int { values, .. } => ValueArray::Int { values, mask },
            ValueArray::Float { values, .. } => ValueArray::Float { values, mask },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_int_with_nulls() {
        let mut b = DataType::Int.get_array(4);
        b.push(Some(Value::Int(1))).unwrap();
        b.push(None).unwrap();
        b.push(Some(Value::Int(3))).unwrap();
        let arr = b.finish();
        assert_eq!(
            arr,
            ValueArray::Int {
                values: vec![1, 0, 3],
                mask: Some(vec![false, true, false])
            }
        );
    }

    #[test]
    fn test_mask_omitted_without_nulls() {
        let mut b = DataType::Float.get_array(2);
        b.push(Some(Value::float(1.5))).unwrap();
        b.push(Some(Value::Int(2))).unwrap();
        assert_eq!(
            b.finish(),
            ValueArray::Float {
                values: vec![1.5, 2.0],
                mask: None
            }
        );
    }

    #[test]
    fn test_rejects_wrong_type() {
        let mut b = DataType::Int.get_array(1);
        let rejected = b.push(Some(Value::str("abc"))).unwrap_err();
        assert_eq!(rejected, Value::str("abc"));
        assert!(b.is_empty());

        let mut b = DataType::Date.get_array(1);
        assert!(b.push(Some(Value::Int(20040101))).is_err());
    }

    #[test]
    fn test_recode_assigns_codes_in_first_seen_order() {
        let mut b = DataType::Recode.get_array(5);
        for v in ["M", "F", "M"] {
            b.push(Some(Value::str(v))).unwrap();
        }
        b.push(None).unwrap();
        match b.finish() {
            ValueArray::Recode { codes, dictionary } => {
                assert_eq!(codes, vec![1, 2, 1, 0]);
                assert_eq!(dictionary, vec![Value::str("M"), Value::str("F")]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_recodedate_requires_dates() {
        let mut b = DataType::RecodeDate.get_array(2);
        let d = NaiveDate::from_ymd_opt(2005, 6, 1).unwrap();
        b.push(Some(Value::Date(d))).unwrap();
        assert!(b.push(Some(Value::str("2005-06-01"))).is_err());
    }

    #[test]
    fn test_tuple_wraps_scalars() {
        let mut b = DataType::Tuple.get_array(3);
        b.push(Some(Value::str("a"))).unwrap();
        b.push(None).unwrap();
        b.push(Some(Value::Tuple(vec![Value::str("b"), Value::str("c")])))
            .unwrap();
        let arr = b.finish();
        assert_eq!(arr.get(0), Some(Value::Tuple(vec![Value::str("a")])));
        assert!(arr.is_null(1));
        assert_eq!(arr.row_values(2).len(), 2);
    }
}
