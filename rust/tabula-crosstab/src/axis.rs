//! Crosstab axes: discrete columns with a fixed, ordered value list.

use std::fmt;

use tabula_common::{Result, error::Error};
use tabula_dataset::{ColumnDef, ColumnView};
use tabula_store::{ColType, DataType, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct CrossTabAxis {
    pub name: String,
    pub label: String,
    pub datatype: DataType,
    pub coltype: ColType,
    pub format_str: String,
    /// Display labels of the source column's values.
    pub outtrans: Vec<(Value, String)>,
    /// The source column's "all" pseudo-value and its label, when set.
    pub all_value: Option<Value>,
    pub all_label: Option<String>,
    /// Axis positions, in order.
    pub values: Vec<Value>,
}

impl CrossTabAxis {
    /// An axis over `column`. Without `values` the axis takes every distinct
    /// value of the column in ascending order.
    pub fn from_column(column: &ColumnView<'_>, values: Option<Vec<Value>>) -> Result<CrossTabAxis> {
        let values = match values {
            Some(values) => values,
            None => column.inverted()?.keys().cloned().collect(),
        };
        let def = column.def();
        Ok(CrossTabAxis {
            name: column.name().to_string(),
            label: column.label().to_string(),
            datatype: column.datatype(),
            coltype: column.coltype(),
            format_str: def
                .map(|d| d.format_str().to_string())
                .unwrap_or_else(|| column.datatype().default_format_str().to_string()),
            outtrans: def.map(|d| d.outtrans.clone()).unwrap_or_default(),
            all_value: def.and_then(|d| d.all_value.clone()),
            all_label: def.and_then(|d| d.all_label.clone()),
            values,
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Position of `value` on this axis.
    pub fn position(&self, value: &Value) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }

    /// Definition of a column holding this axis' values, with the source
    /// column's display translations.
    pub fn column_def(&self) -> ColumnDef {
        let mut def = ColumnDef::new(self.name.as_str(), self.datatype)
            .with_coltype(self.coltype)
            .with_label(self.label.as_str())
            .with_format(self.format_str.as_str())
            .with_outtrans(self.outtrans.clone());
        def.all_value = self.all_value.clone();
        def.all_label = self.all_label.clone();
        def
    }
}

impl fmt::Display for CrossTabAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Axis name: {:?}, label: {:?}", self.name, self.label)?;
        for (i, value) in self.values.iter().enumerate() {
            writeln!(f, "    {i:5}: {}", value.repr())?;
        }
        Ok(())
    }
}

/// Axes of `a` not in `b`, then the axes both share, then those only in
/// `b`. Shared axes must have identical value lists.
pub fn shape_union(a: &[CrossTabAxis], b: &[CrossTabAxis]) -> Result<Vec<CrossTabAxis>> {
    let mut only_a = Vec::new();
    let mut common = Vec::new();
    for axis in a {
        match b.iter().find(|other| other.name == axis.name) {
            Some(other) if other.values != axis.values => {
                return Err(Error::axis_mismatch(format!(
                    "{} column values not compatible: {:?} vs {:?}",
                    axis.name, axis.values, other.values
                )));
            }
            Some(_) => common.push(axis.clone()),
            None => only_a.push(axis.clone()),
        }
    }
    let only_b = b
        .iter()
        .filter(|axis| !a.iter().any(|other| other.name == axis.name))
        .cloned();
    Ok(only_a.into_iter().chain(common).chain(only_b).collect())
}
