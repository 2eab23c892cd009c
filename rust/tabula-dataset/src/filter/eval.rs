//! Compiles parsed filters against a view and evaluates them to row sets.
//!
//! Compilation resolves every column, checks the operator against the
//! column's role and coerces literals to the column datatype, so an
//! unsupported combination fails before any data is touched. Evaluation
//! threads the rows surviving each `and` term into the next as candidates.

use std::cmp::Ordering;

use tabula_common::{RowId, Result, error::Error, rowset};
use tabula_store::{ColType, Value};
use tabula_text_index::SearchOptions;

use super::ops::{Operator, OperatorSupport};
use super::parser::{FilterExpr, Literal};
use crate::inverted::InvertedIndex;
use crate::view::{ColumnView, DatasetView};

enum Plan<'a> {
    Or(Vec<Plan<'a>>),
    And(Vec<Plan<'a>>),
    Not(Box<Plan<'a>>),
    Compare {
        column: ColumnView<'a>,
        op: Operator,
        value: Literal,
    },
}

/// Rows of `view` (local positions, sorted) for which `expr` holds,
/// restricted to `candidates` when given.
pub fn evaluate<V>(view: &V, expr: &FilterExpr, candidates: Option<&[RowId]>) -> Result<Vec<RowId>>
where
    V: DatasetView + ?Sized,
{
    evaluate_with(view, expr, candidates, &SearchOptions::default())
}

pub fn evaluate_with<V>(
    view: &V,
    expr: &FilterExpr,
    candidates: Option<&[RowId]>,
    options: &SearchOptions,
) -> Result<Vec<RowId>>
where
    V: DatasetView + ?Sized,
{
    let plan = compile(view, expr)?;
    let evaluator = Evaluator {
        len: view.len(),
        options,
    };
    evaluator.run(&plan, candidates)
}

fn compile<'a, V>(view: &'a V, expr: &FilterExpr) -> Result<Plan<'a>>
where
    V: DatasetView + ?Sized,
{
    Ok(match expr {
        FilterExpr::Or(parts) => Plan::Or(
            parts
                .iter()
                .map(|p| compile(view, p))
                .collect::<Result<_>>()?,
        ),
        FilterExpr::And(parts) => Plan::And(
            parts
                .iter()
                .map(|p| compile(view, p))
                .collect::<Result<_>>()?,
        ),
        FilterExpr::Not(inner) => Plan::Not(Box::new(compile(view, inner)?)),
        FilterExpr::Compare { column, op, value } => {
            let column = view.get_column(column)?;
            if !column.coltype().supports(*op) {
                return Err(Error::expression(format!(
                    "'{}' operator not supported on {} column '{}'",
                    op,
                    column.coltype(),
                    column.name()
                )));
            }
            let value = coerce(&column, *op, value)?;
            Plan::Compare {
                column,
                op: *op,
                value,
            }
        }
    })
}

fn coerce(column: &ColumnView<'_>, op: Operator, value: &Literal) -> Result<Literal> {
    let datatype = column.datatype();
    let check = |v: &Value| -> Result<Value> {
        if column.coltype() == ColType::RowOrdinal && v.as_i64().is_none() {
            return Err(Error::expression(format!(
                "'{op}' on '{}' needs an integer, got {}",
                column.name(),
                v.repr()
            )));
        }
        Ok(datatype.coerce_literal(v.clone()))
    };
    Ok(match value {
        Literal::Scalar(v) => Literal::Scalar(check(v)?),
        Literal::List(items) => Literal::List(items.iter().map(&check).collect::<Result<_>>()?),
        Literal::Search(text) => Literal::Search(text.clone()),
    })
}

struct Evaluator<'o> {
    len: usize,
    options: &'o SearchOptions,
}

impl Evaluator<'_> {
    fn run(&self, plan: &Plan<'_>, candidates: Option<&[RowId]>) -> Result<Vec<RowId>> {
        match plan {
            Plan::Or(parts) => {
                let mut rows = Vec::new();
                for part in parts {
                    rows = rowset::union(&rows, &self.run(part, candidates)?);
                }
                Ok(rows)
            }
            Plan::And(parts) => {
                let mut rows: Option<Vec<RowId>> = candidates.map(<[RowId]>::to_vec);
                for part in parts {
                    let next = self.run(part, rows.as_deref())?;
                    let empty = next.is_empty();
                    rows = Some(next);
                    if empty {
                        break;
                    }
                }
                Ok(rows.unwrap_or_default())
            }
            Plan::Not(inner) => {
                let matched = self.run(inner, candidates)?;
                Ok(match candidates {
                    Some(candidates) => rowset::difference(candidates, &matched),
                    None => rowset::complement(self.len, &matched),
                })
            }
            Plan::Compare { column, op, value } => {
                let rows = self.compare(column, *op, value, candidates)?;
                Ok(match candidates {
                    Some(candidates) => rowset::intersect(&rows, candidates),
                    None => rows,
                })
            }
        }
    }

    fn compare(
        &self,
        column: &ColumnView<'_>,
        op: Operator,
        value: &Literal,
        candidates: Option<&[RowId]>,
    ) -> Result<Vec<RowId>> {
        match column.coltype() {
            ColType::Categorical | ColType::Ordinal => {
                let index = column.inverted()?;
                Ok(discrete(&index, column, op, value))
            }
            ColType::Scalar | ColType::Weighting => scalar(column, op, value, candidates),
            ColType::SearchableText => match value {
                Literal::Search(text) => Ok(column.search(text, self.options)?.row_ids()),
                other => Err(Error::expression(format!(
                    "'contains' needs search text, got {other}"
                ))),
            },
            ColType::RowOrdinal => Ok(row_ordinal(column, op, value)),
            ColType::Identity => Err(Error::expression(format!(
                "'{op}' operator not supported on identity column '{}'",
                column.name()
            ))),
        }
    }
}

fn scalar_of(value: &Literal) -> Option<&Value> {
    match value {
        Literal::Scalar(v) => Some(v),
        _ => None,
    }
}

fn list_of(value: &Literal) -> &[Value] {
    match value {
        Literal::List(items) => items,
        _ => &[],
    }
}

/// Whether `key` satisfies one of the plain comparisons.
fn test_value(key: &Value, op: Operator, value: &Literal) -> bool {
    let ord = |v: &Value| key.compare(v);
    match op {
        Operator::Equal => scalar_of(value).is_some_and(|v| key.loosely_equals(v)),
        Operator::NotEqual => scalar_of(value).is_some_and(|v| ord(v).is_some_and(Ordering::is_ne)),
        Operator::Less => scalar_of(value).is_some_and(|v| ord(v) == Some(Ordering::Less)),
        Operator::LessEqual => scalar_of(value).is_some_and(|v| ord(v).is_some_and(Ordering::is_le)),
        Operator::Greater => scalar_of(value).is_some_and(|v| ord(v) == Some(Ordering::Greater)),
        Operator::GreaterEqual => {
            scalar_of(value).is_some_and(|v| ord(v).is_some_and(Ordering::is_ge))
        }
        Operator::Between => match list_of(value) {
            [start, end] => {
                ord(start).is_some_and(Ordering::is_ge) && ord(end) == Some(Ordering::Less)
            }
            _ => false,
        },
        Operator::In => list_of(value).iter().any(|v| key.loosely_equals(v)),
        Operator::NotIn => {
            let items = list_of(value);
            !items.iter().any(|v| key.loosely_equals(v))
        }
        _ => false,
    }
}

/// Formatted-key comparison for the `*Prefix` operators.
fn test_prefix(key: &str, op: Operator, value: &Literal, render: impl Fn(&Value) -> String) -> bool {
    match op {
        Operator::InPrefix | Operator::NotInPrefix => {
            let any = list_of(value)
                .iter()
                .any(|v| key.starts_with(render(v).trim_end_matches('*')));
            any == (op == Operator::InPrefix)
        }
        _ => {
            let Some(v) = scalar_of(value) else {
                return false;
            };
            let wanted = render(v);
            let head: String = key.chars().take(wanted.chars().count()).collect();
            let ord = head.cmp(&wanted);
            match op.base() {
                Operator::Equal => ord.is_eq(),
                Operator::NotEqual => ord.is_ne(),
                Operator::Less => ord.is_lt(),
                Operator::LessEqual => ord.is_le(),
                Operator::Greater => ord.is_gt(),
                Operator::GreaterEqual => ord.is_ge(),
                _ => false,
            }
        }
    }
}

fn discrete(index: &InvertedIndex, column: &ColumnView<'_>, op: Operator, value: &Literal) -> Vec<RowId> {
    if op == Operator::Equal {
        if let Some(v) = scalar_of(value) {
            let exact = index.get(v);
            if !exact.is_empty() || !v.is_numeric() {
                return exact.to_vec();
            }
        }
    }
    if op.is_prefix() {
        // literals are matched as typed text; other values use the column format
        let render = |v: &Value| match v {
            Value::Str(s) => s.clone(),
            other => column.do_format(Some(other)),
        };
        return index.rows_matching(|key| {
            test_prefix(&column.do_format(Some(key)), op, value, &render)
        });
    }
    index.rows_matching(|key| test_value(key, op, value))
}

fn scalar(
    column: &ColumnView<'_>,
    op: Operator,
    value: &Literal,
    candidates: Option<&[RowId]>,
) -> Result<Vec<RowId>> {
    let data = column.data()?;
    let matches = |row: RowId| {
        data.get(row as usize)
            .is_some_and(|key| test_value(&key, op, value))
    };
    Ok(match candidates {
        Some(candidates) => candidates.iter().copied().filter(|&r| matches(r)).collect(),
        None => (0..data.len() as RowId).filter(|&r| matches(r)).collect(),
    })
}

/// Row ordinals increase with local position, so every supported operator
/// is a range (or union of ranges) found by binary search.
fn row_ordinal(column: &ColumnView<'_>, op: Operator, value: &Literal) -> Vec<RowId> {
    let len = column.len();
    // local positions whose ordinal is below `bound`
    let below = |bound: i64| -> usize {
        if bound <= 0 {
            return 0;
        }
        match column.ordinals() {
            Some(ids) => ids.partition_point(|&id| (id as i64) < bound),
            None => (bound as u64).min(len as u64) as usize,
        }
    };
    let range = |lo: i64, hi: i64| -> Vec<RowId> {
        let (lo, hi) = (below(lo), below(hi));
        (lo..hi.max(lo)).map(|i| i as RowId).collect()
    };
    let int = |v: &Value| v.as_i64().unwrap_or_default();
    match (op, value) {
        (Operator::Equal, Literal::Scalar(v)) => range(int(v), int(v).saturating_add(1)),
        (Operator::Less, Literal::Scalar(v)) => range(0, int(v)),
        (Operator::LessEqual, Literal::Scalar(v)) => range(0, int(v).saturating_add(1)),
        (Operator::Greater, Literal::Scalar(v)) => range(int(v).saturating_add(1), i64::MAX),
        (Operator::GreaterEqual, Literal::Scalar(v)) => range(int(v), i64::MAX),
        (Operator::Between, Literal::List(items)) if items.len() == 2 => {
            range(int(&items[0]), int(&items[1]))
        }
        (Operator::In, Literal::List(items)) => rowset::normalize(
            items
                .iter()
                .flat_map(|v| range(int(v), int(v).saturating_add(1)))
                .collect(),
        ),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnDef;
    use crate::dataset::Dataset;
    use crate::filter::parse_filter;
    use tabula_store::DataType;

    fn dataset() -> Dataset {
        let mut ds = Dataset::new("patients").unwrap();
        let sex = ["M", "F", "M", "M", "F"].map(|s| Some(Value::str(s)));
        ds.add_column_from_values(ColumnDef::new("sex", DataType::Str), sex)
            .unwrap();
        let age = [40, 25, 61, 33, 19].map(|v| Some(Value::Int(v)));
        ds.add_column_from_values(
            ColumnDef::new("age", DataType::Int).with_coltype(ColType::Scalar),
            age,
        )
        .unwrap();
        let a = [1, 2, 1, 2, -1].map(|v| Some(Value::Int(v)));
        ds.add_column_from_values(ColumnDef::new("a", DataType::Int), a)
            .unwrap();
        let code = ["A01", "A02", "B10", "A1", "C"].map(|s| Some(Value::str(s)));
        ds.add_column_from_values(ColumnDef::new("code", DataType::Str), code)
            .unwrap();
        ds
    }

    fn rows(ds: &Dataset, text: &str) -> Vec<RowId> {
        evaluate(ds, &parse_filter(text).unwrap(), None).unwrap()
    }

    #[test]
    fn test_boolean_composition() {
        let ds = dataset();
        assert_eq!(rows(&ds, "sex = 'M' and age > 30"), vec![0, 2, 3]);
        assert_eq!(rows(&ds, "a=1"), vec![0, 2]);
        assert_eq!(rows(&ds, "not a=1"), vec![1, 3, 4]);
        assert_eq!(rows(&ds, "a = 2 or age < 20"), vec![1, 3, 4]);
        assert_eq!(rows(&ds, "sex = 'F' and not (age >= 20 and age < 30)"), vec![4]);
    }

    #[test]
    fn test_discrete_ranges() {
        let ds = dataset();
        assert_eq!(rows(&ds, "a between (1, 2)"), vec![0, 2]);
        assert_eq!(rows(&ds, "a in (2, -1)"), vec![1, 3, 4]);
        assert_eq!(rows(&ds, "a notin (2, -1)"), vec![0, 2]);
        assert_eq!(rows(&ds, "a >= 1"), vec![0, 1, 2, 3]);
        assert_eq!(rows(&ds, "a = 1.0"), vec![0, 2]);
        assert!(rows(&ds, "a = 7").is_empty());
    }

    #[test]
    fn test_prefix_operators() {
        let ds = dataset();
        assert_eq!(rows(&ds, "code starting with 'A'"), vec![0, 1, 3]);
        assert_eq!(rows(&ds, "code =: 'A0'"), vec![0, 1]);
        assert_eq!(rows(&ds, "code !=: 'A'"), vec![2, 4]);
        assert_eq!(rows(&ds, "code <: 'B'"), vec![0, 1, 3]);
        assert_eq!(rows(&ds, "code in: ('B*', 'C')"), vec![2, 4]);
        assert_eq!(rows(&ds, "code notin: ('A*')"), vec![2, 4]);
    }

    #[test]
    fn test_row_ordinal() {
        let ds = dataset();
        assert_eq!(rows(&ds, "row_ordinal < 2"), vec![0, 1]);
        assert_eq!(rows(&ds, "row_ordinal between (1, 3)"), vec![1, 2]);
        assert_eq!(rows(&ds, "row_ordinal in (4, 0, 9)"), vec![0, 4]);
        assert_eq!(rows(&ds, "row_ordinal > 3 and sex = 'F'"), vec![4]);
    }

    #[test]
    fn test_unsupported_operator_names_everything() {
        let ds = dataset();
        let err = evaluate(&ds, &parse_filter("age in (1, 2)").unwrap(), None).unwrap_err();
        assert!(err.is_expression());
        let message = err.to_string();
        assert!(message.contains("'in'"), "{message}");
        assert!(message.contains("scalar"), "{message}");
        assert!(message.contains("'age'"), "{message}");

        let err = evaluate(&ds, &parse_filter("missing = 1").unwrap(), None).unwrap_err();
        assert!(!err.is_expression());
    }

    #[test]
    fn test_candidates_restrict() {
        let ds = dataset();
        let expr = parse_filter("a = 1 or a = 2").unwrap();
        assert_eq!(evaluate(&ds, &expr, Some(&[2, 3, 4])).unwrap(), vec![2, 3]);
        let expr = parse_filter("not sex = 'M'").unwrap();
        assert_eq!(evaluate(&ds, &expr, Some(&[0, 1])).unwrap(), vec![1]);
    }
}
