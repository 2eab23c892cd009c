//! Read access shared by datasets and their filtered views.

use std::sync::Arc;
use std::time::Instant;

use tabula_common::{RowId, Result, error::Error};
use tabula_store::{ColType, DataType, Value, ValueArray};
use tabula_text_index::{SearchHits, SearchOptions};

use crate::column::{Column, ColumnDef, ROW_ORDINAL};
use crate::dataset::Dataset;
use crate::filter;
use crate::inverted::InvertedIndex;

/// The read surface of a dataset: the root [`Dataset`] itself or a
/// [`FilteredDataset`] selecting some of its rows.
///
/// Row numbers handed out by a view are local positions within it. A view
/// over the root maps position `i` to root row `record_ids()[i]`.
pub trait DatasetView {
    fn name(&self) -> &str;

    fn label(&self) -> &str;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn generation(&self) -> u64;

    /// The dataset owning the column storage.
    fn root(&self) -> &Dataset;

    /// Root rows selected by this view, sorted. `None` for the root itself.
    fn record_ids(&self) -> Option<&[RowId]>;

    fn column_names(&self) -> Vec<String> {
        self.root().column_names()
    }

    fn has_column(&self, name: &str) -> bool {
        name == ROW_ORDINAL || self.root().column(name).is_some()
    }

    fn get_column(&self, name: &str) -> Result<ColumnView<'_>> {
        let len = self.len();
        let selection = self.record_ids();
        if name == ROW_ORDINAL {
            return Ok(ColumnView {
                source: ColumnSource::RowOrdinal,
                selection,
                len,
            });
        }
        match self.root().column(name) {
            Some(column) => Ok(ColumnView {
                source: ColumnSource::Stored(column),
                selection,
                len,
            }),
            None => Err(Error::column_not_found(self.name(), name)),
        }
    }

    /// Rows of this view matching the filter expression `expr`.
    fn filter(&self, expr: &str) -> Result<FilteredDataset<'_>> {
        let record_ids = match self.record_ids() {
            None => self.root().anonymous_filter(expr)?,
            Some(_) => self.compose(&filter::evaluate_str(self, expr, None)?),
        };
        Ok(FilteredDataset::new(
            self.root(),
            record_ids,
            self.name().to_string(),
            self.label().to_string(),
        )
        .with_desc(expr))
    }

    /// Every `step`th row from `start` up to (not including) `stop`.
    fn slice(&self, start: usize, stop: Option<usize>, step: usize) -> Result<FilteredDataset<'_>> {
        if step == 0 {
            return Err(Error::invalid_arg("step", "slice step must be positive"));
        }
        let stop = stop.unwrap_or(self.len()).min(self.len());
        let local: Vec<RowId> = (start.min(stop)..stop)
            .step_by(step)
            .map(|i| i as RowId)
            .collect();
        let name = format!("slice_{start}_{stop}_{step}_{}", self.name());
        let label = format!("{} [{start}:{stop}:{step}] slice", self.label());
        Ok(FilteredDataset::new(self.root(), self.compose(&local), name, label))
    }

    /// A random `fraction` of the rows, kept in row order. The same `seed`
    /// draws the same rows.
    fn sample(&self, fraction: f64, seed: Option<u64>) -> Result<FilteredDataset<'_>> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(Error::invalid_arg(
                "fraction",
                format!("sample fraction must be in (0, 1], got {fraction}"),
            ));
        }
        let count = ((self.len() as f64) * fraction).round() as usize;
        let mut rng = match seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        let mut local: Vec<RowId> = (0..self.len() as RowId).collect();
        rng.shuffle(&mut local);
        local.truncate(count);
        local.sort_unstable();

        let pct = (fraction * 100.0).round() as u32;
        let name = format!("samp{pct:02}_{}", self.name());
        let label = format!("{} {pct}% sample", self.label());
        Ok(FilteredDataset::new(self.root(), self.compose(&local), name, label))
    }

    /// Maps local positions to root rows.
    fn compose(&self, local: &[RowId]) -> Arc<Vec<RowId>> {
        match self.record_ids() {
            None => Arc::new(local.to_vec()),
            Some(parent) => Arc::new(local.iter().map(|&i| parent[i as usize]).collect()),
        }
    }
}

/// A read-only selection of a dataset's rows. Column data is gathered from
/// the root's storage on access; nothing is copied up front.
#[derive(Debug, Clone)]
pub struct FilteredDataset<'a> {
    root: &'a Dataset,
    record_ids: Arc<Vec<RowId>>,
    name: String,
    label: String,
    desc: Option<String>,
    generation: u64,
}

impl<'a> FilteredDataset<'a> {
    pub fn new(
        root: &'a Dataset,
        record_ids: Arc<Vec<RowId>>,
        name: String,
        label: String,
    ) -> FilteredDataset<'a> {
        FilteredDataset {
            generation: root.generation(),
            root,
            record_ids,
            name,
            label,
            desc: None,
        }
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    pub fn desc(&self) -> Option<&str> {
        self.desc.as_deref()
    }

    /// The selected root rows.
    pub fn ids(&self) -> &Arc<Vec<RowId>> {
        &self.record_ids
    }
}

impl DatasetView for FilteredDataset<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn len(&self) -> usize {
        self.record_ids.len()
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn root(&self) -> &Dataset {
        self.root
    }

    fn record_ids(&self) -> Option<&[RowId]> {
        Some(&self.record_ids)
    }
}

#[derive(Debug, Clone, Copy)]
enum ColumnSource<'a> {
    Stored(&'a Column),
    RowOrdinal,
}

/// A column as seen through a view.
#[derive(Debug, Clone, Copy)]
pub struct ColumnView<'a> {
    source: ColumnSource<'a>,
    selection: Option<&'a [RowId]>,
    len: usize,
}

impl<'a> ColumnView<'a> {
    pub fn name(&self) -> &str {
        match self.source {
            ColumnSource::Stored(column) => column.name(),
            ColumnSource::RowOrdinal => ROW_ORDINAL,
        }
    }

    pub fn label(&self) -> &str {
        match self.source {
            ColumnSource::Stored(column) => column.def().label(),
            ColumnSource::RowOrdinal => "Ordinal",
        }
    }

    /// The stored column's definition; `None` for `row_ordinal`.
    pub fn def(&self) -> Option<&'a ColumnDef> {
        match self.source {
            ColumnSource::Stored(column) => Some(column.def()),
            ColumnSource::RowOrdinal => None,
        }
    }

    pub fn coltype(&self) -> ColType {
        match self.source {
            ColumnSource::Stored(column) => column.coltype(),
            ColumnSource::RowOrdinal => ColType::RowOrdinal,
        }
    }

    pub fn datatype(&self) -> DataType {
        match self.source {
            ColumnSource::Stored(column) => column.datatype(),
            ColumnSource::RowOrdinal => DataType::Int,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Root row of local position `i`.
    pub fn ordinal(&self, i: usize) -> RowId {
        match self.selection {
            Some(ids) => ids[i],
            None => i as RowId,
        }
    }

    /// Root rows of every local position, when they differ from `0..len`.
    pub fn ordinals(&self) -> Option<&'a [RowId]> {
        self.selection
    }

    /// The column's values for this view's rows.
    pub fn data(&self) -> Result<Arc<ValueArray>> {
        match (self.source, self.selection) {
            (ColumnSource::Stored(column), None) => column.data(),
            (ColumnSource::Stored(column), Some(ids)) => Ok(Arc::new(column.take(ids)?)),
            (ColumnSource::RowOrdinal, _) => {
                let mut builder = DataType::Int.get_array(self.len);
                for i in 0..self.len {
                    builder
                        .push(Some(Value::Int(self.ordinal(i) as i64)))
                        .map_err(|v| Error::store_type(ROW_ORDINAL, i, v.repr(), "int"))?;
                }
                Ok(Arc::new(builder.finish()))
            }
        }
    }

    pub fn get(&self, i: usize) -> Result<Option<Value>> {
        match self.source {
            ColumnSource::Stored(column) => Ok(column.data()?.get(self.ordinal(i) as usize)),
            ColumnSource::RowOrdinal => Ok(Some(Value::Int(self.ordinal(i) as i64))),
        }
    }

    /// The inverted index restricted to this view, with local row numbers.
    pub fn inverted(&self) -> Result<Arc<InvertedIndex>> {
        match (self.source, self.selection) {
            (ColumnSource::Stored(column), None) => column.inverted(),
            (ColumnSource::Stored(column), Some(ids)) => {
                let started = Instant::now();
                let local = column.inverted()?.localize(ids);
                log::debug!(
                    "localized {} index to {} rows in {:.3}s",
                    column.name(),
                    ids.len(),
                    started.elapsed().as_secs_f64()
                );
                Ok(Arc::new(local))
            }
            (ColumnSource::RowOrdinal, _) => Err(Error::invalid_operation(format!(
                "'{ROW_ORDINAL}' has no inverted index"
            ))),
        }
    }

    /// Text search over this view's rows, reported in local row numbers.
    pub fn search(&self, text: &str, options: &SearchOptions) -> Result<SearchHits> {
        match self.source {
            ColumnSource::Stored(column) => {
                let hits = column.search(text, options)?;
                Ok(match self.selection {
                    None => hits,
                    Some(ids) => hits.remap(|row| ids.binary_search(&row).ok().map(|i| i as RowId)),
                })
            }
            ColumnSource::RowOrdinal => Err(Error::invalid_operation(format!(
                "'{ROW_ORDINAL}' is not searchable"
            ))),
        }
    }

    pub fn do_format(&self, value: Option<&Value>) -> String {
        match self.def() {
            Some(def) => def.do_format(value),
            None => value.map(Value::to_string).unwrap_or_default(),
        }
    }

    pub fn do_outtrans(&self, value: Option<&Value>) -> String {
        match self.def() {
            Some(def) => def.do_outtrans(value),
            None => self.do_format(value),
        }
    }
}
