//! Building, reshaping and flattening crosstabs.

use std::fmt;
use std::time::Instant;

use ahash::AHashMap;
use itertools::Itertools;
use tabula_common::{Result, error::Error};
use tabula_dataset::{ColumnDef, Dataset, DatasetView};
use tabula_store::{ColType, DataType, Value};

use crate::axis::CrossTabAxis;
use crate::table::MaskedTable;

/// One measure of a crosstab.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossTabTable {
    pub name: String,
    pub label: String,
    pub data: MaskedTable,
}

/// Axes plus named tables, each shaped exactly like the axes.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossTab {
    name: String,
    axes: Vec<CrossTabAxis>,
    tables: Vec<CrossTabTable>,
}

impl CrossTab {
    /// An empty crosstab over `axes`.
    pub fn new(name: impl Into<String>, axes: Vec<CrossTabAxis>) -> CrossTab {
        CrossTab {
            name: name.into(),
            axes,
            tables: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn axes(&self) -> &[CrossTabAxis] {
        &self.axes
    }

    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(CrossTabAxis::len).collect()
    }

    pub fn tables(&self) -> &[CrossTabTable] {
        &self.tables
    }

    pub fn get_table(&self, name: &str) -> Result<&CrossTabTable> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| {
                Error::invalid_arg("table", format!("crosstab '{}' has no table '{name}'", self.name))
            })
    }

    pub fn add_table(
        &mut self,
        name: impl Into<String>,
        label: impl Into<String>,
        data: MaskedTable,
    ) -> Result<()> {
        let name = name.into();
        let shape = self.shape();
        if data.shape() != shape.as_slice() {
            return Err(Error::axis_mismatch(format!(
                "table {name} shape {:?} != crosstab shape {shape:?}",
                data.shape()
            )));
        }
        self.tables.retain(|t| t.name != name);
        self.tables.push(CrossTabTable {
            name,
            label: label.into(),
            data,
        });
        Ok(())
    }

    /// The axes a crosstab of `view` would have: its discrete columns,
    /// skipping internal ones whose names start with `_`.
    pub fn axes_of<V>(view: &V) -> Result<Vec<CrossTabAxis>>
    where
        V: DatasetView + ?Sized,
    {
        let mut axes = Vec::new();
        for name in view.column_names() {
            let column = view.get_column(&name)?;
            if column.coltype().is_discrete() && !name.starts_with('_') {
                axes.push(CrossTabAxis::from_column(&column, None)?);
            }
        }
        Ok(axes)
    }

    /// Builds a crosstab from a summary dataset.
    ///
    /// Axes matching `shaped_like` come first, in its order and with its
    /// value lists; the view's other discrete columns follow. Every scalar
    /// column becomes a table whose cell holds the value of the row with
    /// that combination of axis values. Cells no row reaches stay masked.
    pub fn from_summary<V>(view: &V, shaped_like: Option<&[CrossTabAxis]>) -> Result<CrossTab>
    where
        V: DatasetView + ?Sized,
    {
        let started = Instant::now();
        let mut axes = Vec::new();
        for axis in shaped_like.unwrap_or_default() {
            if view.has_column(&axis.name) {
                let column = view.get_column(&axis.name)?;
                axes.push(CrossTabAxis::from_column(&column, Some(axis.values.clone()))?);
            }
        }
        for name in view.column_names() {
            if name.starts_with('_') || axes.iter().any(|a| a.name == name) {
                continue;
            }
            let column = view.get_column(&name)?;
            if column.coltype().is_discrete() {
                axes.push(CrossTabAxis::from_column(&column, None)?);
            }
        }
        if axes.is_empty() {
            return Err(Error::invalid_operation(format!(
                "dataset '{}' must have at least one discrete column",
                view.name()
            )));
        }

        // cell of every row; None where some axis value is null or off-axis
        let rows = view.len();
        let mut cells: Vec<Option<Vec<usize>>> = vec![Some(Vec::with_capacity(axes.len())); rows];
        for axis in &axes {
            let positions: AHashMap<&Value, usize> =
                axis.values.iter().enumerate().map(|(i, v)| (v, i)).collect();
            let data = view.get_column(&axis.name)?.data()?;
            for (row, cell) in cells.iter_mut().enumerate() {
                let position = data
                    .get(row)
                    .and_then(|v| positions.get(&v).copied());
                match position {
                    Some(i) => {
                        if let Some(index) = cell {
                            index.push(i);
                        }
                    }
                    None => *cell = None,
                }
            }
        }

        let mut crosstab = CrossTab::new(view.name(), axes);
        let shape = crosstab.shape();
        for name in view.column_names() {
            let column = view.get_column(&name)?;
            if !column.coltype().is_scalar() {
                continue;
            }
            let data = column.data()?;
            let mut table = MaskedTable::masked(&shape);
            for (row, cell) in cells.iter().enumerate() {
                if let Some(index) = cell {
                    table.set(index, data.get_f64(row))?;
                }
            }
            crosstab.add_table(name.as_str(), column.label(), table)?;
        }

        log::info!(
            "{} crosstab generation took {:.3}s for {rows} rows, shape {shape:?}",
            crosstab.name,
            started.elapsed().as_secs_f64()
        );
        Ok(crosstab)
    }

    /// [`CrossTab::from_summary`] for a dataset produced by
    /// [`CrossTab::to_summset`].
    pub fn from_summset(dataset: &Dataset, shaped_like: Option<&[CrossTabAxis]>) -> Result<CrossTab> {
        CrossTab::from_summary(dataset, shaped_like)
    }

    /// Sums every table along each axis that `target` does not have.
    ///
    /// The axes that remain must appear in `target` in the same order.
    /// Collapsing every axis is refused.
    pub fn collapse_axes_not_in(&mut self, target: &[CrossTabAxis]) -> Result<()> {
        let in_target = |name: &str| target.iter().any(|t| t.name == name);
        let kept: Vec<&str> = self
            .axes
            .iter()
            .map(|a| a.name.as_str())
            .filter(|n| in_target(n))
            .collect();
        if kept.is_empty() {
            if let Some(last) = self.axes.last() {
                return Err(Error::invalid_operation(format!(
                    "crosstab '{}': cannot collapse last axis: '{}'",
                    self.name, last.name
                )));
            }
        }
        let target_order: Vec<&str> = target
            .iter()
            .map(|t| t.name.as_str())
            .filter(|n| kept.contains(n))
            .collect();
        if kept != target_order {
            return Err(Error::axis_mismatch(format!(
                "crosstab '{}': axes {kept:?} are ordered {target_order:?} in the target",
                self.name
            )));
        }

        let mut i = 0;
        while i < self.axes.len() {
            if in_target(&self.axes[i].name) {
                i += 1;
                continue;
            }
            let axis = self.axes.remove(i);
            for table in &mut self.tables {
                table.data = table.data.sum_axis(i)?;
            }
            log::debug!("crosstab {}: collapsed axis {}", self.name, axis.name);
        }
        Ok(())
    }

    /// Inserts every axis of `target` this crosstab lacks, repeating each
    /// table along it, so that the shapes end up equal.
    ///
    /// Every existing axis must be in `target`, in the same order and with
    /// the same values.
    pub fn replicate_axes(&mut self, target: &[CrossTabAxis]) -> Result<()> {
        for axis in &self.axes {
            match target.iter().find(|t| t.name == axis.name) {
                None => {
                    return Err(Error::axis_mismatch(format!(
                        "crosstab '{}': axis '{}' is not in the target shape",
                        self.name, axis.name
                    )));
                }
                Some(t) if t.values != axis.values => {
                    return Err(Error::axis_mismatch(format!(
                        "{} column values not compatible: {:?} vs {:?}",
                        axis.name, axis.values, t.values
                    )));
                }
                Some(_) => {}
            }
        }
        let mine: Vec<&str> = self.axes.iter().map(|a| a.name.as_str()).collect();
        let target_order: Vec<&str> = target
            .iter()
            .map(|t| t.name.as_str())
            .filter(|n| mine.contains(n))
            .collect();
        if mine != target_order {
            return Err(Error::axis_mismatch(format!(
                "crosstab '{}': axes {mine:?} are ordered {target_order:?} in the target",
                self.name
            )));
        }

        for (i, foreign) in target.iter().enumerate() {
            if self.axes.get(i).is_some_and(|a| a.name == foreign.name) {
                continue;
            }
            self.axes.insert(i, foreign.clone());
            for table in &mut self.tables {
                table.data = table.data.replicate_axis(i, foreign.len())?;
            }
            log::debug!("crosstab {}: replicated along {}", self.name, foreign.name);
        }
        Ok(())
    }

    /// Flattens the crosstab into an unbacked summary dataset: one column
    /// per axis, one float column per table and one row per axis
    /// combination where some table has a value.
    pub fn to_summset(&self, name: &str) -> Result<Dataset> {
        if self.axes.is_empty() {
            return Err(Error::invalid_operation(format!(
                "crosstab '{}' has no axes",
                self.name
            )));
        }
        let combos: Vec<Vec<usize>> = self
            .axes
            .iter()
            .map(|a| 0..a.len())
            .multi_cartesian_product()
            .filter(|index| {
                self.tables.is_empty() || self.tables.iter().any(|t| t.data.get(index).is_some())
            })
            .collect();

        let mut dataset = Dataset::new(name)?;
        for (k, axis) in self.axes.iter().enumerate() {
            let values = combos.iter().map(|index| Some(axis.values[index[k]].clone()));
            dataset.add_column_from_values(axis.column_def(), values)?;
        }
        for table in &self.tables {
            let def = ColumnDef::new(table.name.as_str(), DataType::Float)
                .with_coltype(ColType::Scalar)
                .with_label(table.label.as_str());
            let values = combos
                .iter()
                .map(|index| table.data.get(index).map(Value::float));
            dataset.add_column_from_values(def, values)?;
        }
        Ok(dataset)
    }
}

impl fmt::Display for CrossTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Axes")?;
        for (i, axis) in self.axes.iter().enumerate() {
            writeln!(f, "{i:3}:{}", axis.label)?;
        }
        for table in &self.tables {
            writeln!(f, "{}", table.label)?;
            let cells: Vec<String> = table
                .data
                .cells()
                .map(|c| c.map_or_else(|| "--".to_string(), |v| v.to_string()))
                .collect();
            writeln!(f, "  {}", cells.join(" "))?;
        }
        Ok(())
    }
}

/// `crosstab()` on datasets and their views.
pub trait CrossTabExt: DatasetView {
    fn crosstab(&self) -> Result<CrossTab> {
        CrossTab::from_summary(self, None)
    }

    fn crosstab_shaped_like(&self, axes: &[CrossTabAxis]) -> Result<CrossTab> {
        CrossTab::from_summary(self, Some(axes))
    }
}

impl<V: DatasetView + ?Sized> CrossTabExt for V {}
