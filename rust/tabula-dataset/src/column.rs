//! Column definitions, the store chain and stored column state.
//!
//! Storing a column runs every incoming row through the same chain:
//!
//! 1. tuple normalisation for multi-value columns (nulls become an empty
//!    tuple, elements are sorted and de-duplicated),
//! 2. missing-value mapping (listed values become null),
//! 3. literal coercion and a type check against the declared datatype,
//! 4. index construction: an inverted index for discrete columns, word
//!    postings for searchable text.
//!
//! A type mismatch stops the chain at the offending row.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tabula_common::{RowId, Result, error::Error, names::check_name_ok};
use tabula_store::{
    ArrayHandle, ColType, DataType, Loadable, Value, ValueArray, format::derive_float_format,
    format_value, persist,
};
use tabula_text_index::{PostingsFile, SearchHits, SearchOptions, index_text, search};
use tempfile::TempDir;

use crate::inverted::{INDEX_EXTENSION, InvertedIndex, InvertedIndexBuilder};

/// Name of the synthetic row-ordinal column every dataset exposes.
pub const ROW_ORDINAL: &str = "row_ordinal";

pub const OCCURRENCES_FILE: &str = "occurrences.postings";
pub const WORD_INDEX_FILE: &str = "wordidx.words";

const DEFAULT_ALL_LABEL: &str = "<All>";

/// Everything known about a column apart from its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub label: Option<String>,
    pub desc: Option<String>,
    pub coltype: ColType,
    pub datatype: DataType,
    /// Display format; the datatype default when unset. Float columns get
    /// one derived from their largest magnitude at store time.
    pub format_str: Option<String>,
    /// Value standing for "all categories" in summaries.
    pub all_value: Option<Value>,
    pub all_label: Option<String>,
    /// Values replaced by null before storage.
    #[serde(default)]
    pub missing_values: Vec<Value>,
    /// Sibling columns whose values are gathered row-wise into this tuple column.
    #[serde(default)]
    pub multisource_cols: Vec<String>,
    /// Value to display label translation.
    #[serde(default)]
    pub outtrans: Vec<(Value, String)>,
}

impl ColumnDef {
    /// A definition with the datatype's default role.
    pub fn new(name: impl Into<String>, datatype: DataType) -> ColumnDef {
        ColumnDef {
            name: name.into(),
            label: None,
            desc: None,
            coltype: datatype.default_coltype(),
            datatype,
            format_str: None,
            all_value: None,
            all_label: None,
            missing_values: Vec::new(),
            multisource_cols: Vec::new(),
            outtrans: Vec::new(),
        }
    }

    pub fn with_coltype(mut self, coltype: ColType) -> Self {
        self.coltype = coltype;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    pub fn with_format(mut self, format_str: impl Into<String>) -> Self {
        self.format_str = Some(format_str.into());
        self
    }

    pub fn with_all(mut self, value: Value, label: impl Into<String>) -> Self {
        self.all_value = Some(value);
        self.all_label = Some(label.into());
        self
    }

    pub fn with_missing_values(mut self, values: Vec<Value>) -> Self {
        self.missing_values = values;
        self
    }

    pub fn with_multisource(mut self, columns: Vec<String>) -> Self {
        self.multisource_cols = columns;
        self
    }

    pub fn with_outtrans(mut self, outtrans: Vec<(Value, String)>) -> Self {
        self.outtrans = outtrans;
        self
    }

    /// The label, falling back to the name.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }

    pub fn format_str(&self) -> &str {
        self.format_str
            .as_deref()
            .unwrap_or_else(|| self.datatype.default_format_str())
    }

    pub fn all_value(&self) -> Value {
        self.all_value
            .clone()
            .unwrap_or_else(|| self.datatype.default_all_value())
    }

    pub fn all_label(&self) -> &str {
        self.all_label.as_deref().unwrap_or(DEFAULT_ALL_LABEL)
    }

    /// Renders `value` with the column's format string.
    pub fn do_format(&self, value: Option<&Value>) -> String {
        format_value(value, self.format_str())
    }

    /// Display label for `value`: the "all" label, an output translation, or
    /// the formatted value.
    pub fn do_outtrans(&self, value: Option<&Value>) -> String {
        if let Some(v) = value {
            if self.coltype.is_discrete() && *v == self.all_value() {
                return self.all_label().to_string();
            }
            if let Some((_, label)) = self.outtrans.iter().find(|(k, _)| k == v) {
                return label.clone();
            }
        }
        self.do_format(value)
    }

    /// Checks the name and that the role suits the datatype.
    pub fn validate(&self) -> Result<()> {
        check_name_ok("column", &self.name)?;
        if self.name == ROW_ORDINAL || self.coltype == ColType::RowOrdinal {
            return Err(Error::invalid_name(format!(
                "column name '{ROW_ORDINAL}' and its role are reserved"
            )));
        }
        let compatible = match self.coltype {
            ColType::SearchableText => self.datatype == DataType::Str,
            ColType::Scalar | ColType::Weighting => {
                self.datatype.is_numeric() || self.datatype.is_datetime()
            }
            _ => true,
        };
        if !compatible {
            return Err(Error::invalid_arg(
                &self.name,
                format!(
                    "a {} column cannot hold {} data",
                    self.coltype, self.datatype
                ),
            ));
        }
        if !self.multisource_cols.is_empty() && !self.datatype.is_multivalue() {
            return Err(Error::invalid_arg(
                &self.name,
                "multi-source columns must have datatype tuple",
            ));
        }
        Ok(())
    }

    /// Applies tuple normalisation, missing-value mapping and literal
    /// coercion to one incoming value.
    pub fn normalize(&self, value: Option<Value>) -> Option<Value> {
        let keep = |v: &Value| !self.missing_values.contains(v);
        if self.datatype.is_multivalue() {
            let mut items = match value {
                None => Vec::new(),
                Some(Value::Tuple(items)) => items,
                Some(single) => vec![single],
            };
            items.retain(keep);
            return Some(Value::Tuple(items));
        }
        value
            .filter(keep)
            .map(|v| self.datatype.coerce_literal(v))
    }
}

/// One row of a multi-source column: the non-null values of its sources,
/// with tuple sources flattened.
pub fn gather_multisource<'v, I>(sources: I) -> Value
where
    I: IntoIterator<Item = Option<&'v Value>>,
{
    let items = sources
        .into_iter()
        .flatten()
        .flat_map(|v| match v {
            Value::Tuple(items) => items.clone(),
            other => vec![other.clone()],
        })
        .collect();
    Value::Tuple(items)
}

/// A column's stored data and indexes.
#[derive(Debug)]
pub struct Column {
    def: ColumnDef,
    len: usize,
    data: ArrayHandle,
    inverted: Option<Loadable<InvertedIndex>>,
    postings: Option<Loadable<PostingsFile>>,
    // Holds the postings of searchable text in unbacked datasets.
    _scratch: Option<TempDir>,
}

impl Column {
    /// Runs `values` through the store chain. With `dir` set, data and
    /// indexes are written under it and loaded back on demand; otherwise
    /// they stay resident.
    pub fn store<I>(def: ColumnDef, values: I, dir: Option<&Path>) -> Result<Column>
    where
        I: IntoIterator<Item = Option<Value>>,
    {
        Column::try_store(def, values.into_iter().map(Ok), dir)
    }

    /// [`Column::store`] over a fallible value stream, such as spilled
    /// chunks being read back. The first error ends the store.
    pub fn try_store<I>(mut def: ColumnDef, values: I, dir: Option<&Path>) -> Result<Column>
    where
        I: IntoIterator<Item = Result<Option<Value>>>,
    {
        let started = Instant::now();
        def.validate()?;
        let values = values.into_iter();
        let mut builder = def.datatype.get_array(values.size_hint().0);
        let mut inverted = def.coltype.is_discrete().then(InvertedIndexBuilder::new);

        let mut scratch = None;
        let postings_dir = match (def.coltype.is_searchabletext(), dir) {
            (false, _) => None,
            (true, Some(dir)) => Some(dir.to_path_buf()),
            (true, None) => {
                let tmp = TempDir::new()
                    .map_err(|e| Error::io("text index scratch directory", e))?;
                let path = tmp.path().to_path_buf();
                scratch = Some(tmp);
                Some(path)
            }
        };
        if let Some(dir) = dir {
            std::fs::create_dir_all(dir).map_err(|e| Error::io(dir.display().to_string(), e))?;
        }
        let mut postings = match &postings_dir {
            Some(dir) => Some(PostingsFile::create(
                &dir.join(OCCURRENCES_FILE),
                &dir.join(WORD_INDEX_FILE),
            )?),
            None => None,
        };

        for (row, value) in values.enumerate() {
            let value = def.normalize(value?);
            if let (Some(postings), Some(Value::Str(text))) = (postings.as_mut(), &value) {
                index_text(postings, row as RowId, text)?;
            }
            if let (Some(inverted), Some(v)) = (inverted.as_mut(), &value) {
                match v {
                    Value::Tuple(items) => inverted.push_row(row as RowId, items.iter().cloned()),
                    other => inverted.push_row(row as RowId, [other.clone()]),
                }
            }
            builder.push(value).map_err(|bad| {
                Error::store_type(&def.name, row, bad.repr(), def.datatype.name())
            })?;
        }

        let array = builder.finish();
        let len = array.len();
        if def.datatype == DataType::Float && def.format_str.is_none() {
            def.format_str = Some(derive_float_format(array.max_abs()));
        }

        let data_path = dir.map(|d| d.join(data_file_name(def.datatype)));
        let data = persist::store(def.datatype, array, data_path.as_deref())?;

        let inverted = match (inverted, dir) {
            (None, _) => None,
            (Some(builder), None) => Some(Loadable::resident(builder.finish())),
            (Some(builder), Some(dir)) => {
                let path = inverted_path(dir);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)
                        .map_err(|e| Error::io(parent.display().to_string(), e))?;
                }
                builder.finish().save(&path)?;
                Some(Loadable::on_disk(path))
            }
        };

        let postings = match (postings, postings_dir) {
            (Some(mut file), Some(dir)) => {
                file.flush()?;
                Some(Loadable::on_disk(dir))
            }
            _ => None,
        };

        log::info!(
            "stored column {} ({} rows, {}) in {:.3}s",
            def.name,
            len,
            def.datatype,
            started.elapsed().as_secs_f64()
        );
        Ok(Column {
            def,
            len,
            data,
            inverted,
            postings,
            _scratch: scratch,
        })
    }

    /// A column whose files already exist under `dir`.
    pub fn open(def: ColumnDef, len: usize, dir: &Path) -> Column {
        let data = persist::open(dir.join(data_file_name(def.datatype)));
        let inverted = def
            .coltype
            .is_discrete()
            .then(|| Loadable::on_disk(inverted_path(dir)));
        let postings = def
            .coltype
            .is_searchabletext()
            .then(|| Loadable::on_disk(dir.to_path_buf()));
        Column {
            def,
            len,
            data,
            inverted,
            postings,
            _scratch: None,
        }
    }

    pub fn def(&self) -> &ColumnDef {
        &self.def
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn coltype(&self) -> ColType {
        self.def.coltype
    }

    pub fn datatype(&self) -> DataType {
        self.def.datatype
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Directory holding the column's files, if it is backed.
    pub fn path(&self) -> Option<&Path> {
        self.data.path().and_then(Path::parent)
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_loaded()
    }

    pub fn data(&self) -> Result<Arc<ValueArray>> {
        let datatype = self.def.datatype;
        self.data.ensure_loaded(|path| persist::load(datatype, path))
    }

    pub fn inverted(&self) -> Result<Arc<InvertedIndex>> {
        match &self.inverted {
            Some(inverted) => inverted.ensure_loaded(|path| {
                let started = Instant::now();
                let index = InvertedIndex::load(path)?;
                log::info!(
                    "load of {} index ({} values) took {:.3}s",
                    self.def.name,
                    index.cardinality(),
                    started.elapsed().as_secs_f64()
                );
                Ok(index)
            }),
            None => Err(Error::invalid_operation(format!(
                "{} column '{}' has no inverted index",
                self.def.coltype, self.def.name
            ))),
        }
    }

    pub fn postings(&self) -> Result<Arc<PostingsFile>> {
        match &self.postings {
            Some(postings) => postings.ensure_loaded(|dir| {
                PostingsFile::open(&dir.join(OCCURRENCES_FILE), &dir.join(WORD_INDEX_FILE))
            }),
            None => Err(Error::invalid_operation(format!(
                "{} column '{}' has no word index",
                self.def.coltype, self.def.name
            ))),
        }
    }

    /// Evaluates a text search expression over this column's words.
    pub fn search(&self, text: &str, options: &SearchOptions) -> Result<SearchHits> {
        let postings = self.postings()?;
        search::search(postings.as_ref(), text, options)
    }

    /// Gathers `rows` from the stored data.
    pub fn take(&self, rows: &[RowId]) -> Result<ValueArray> {
        persist::take(self.def.datatype, &self.data, rows)
    }

    /// Releases the resident copies of file-backed data and indexes.
    pub fn unload(&mut self) -> bool {
        let mut released = self.data.unload();
        if let Some(inverted) = self.inverted.as_mut() {
            released |= inverted.unload();
        }
        if let Some(postings) = self.postings.as_mut() {
            released |= postings.unload();
        }
        released
    }

    pub(crate) fn set_def(&mut self, def: ColumnDef) {
        self.def = def;
    }
}

/// `data.<ext>` for the datatype.
pub fn data_file_name(datatype: DataType) -> String {
    format!("data.{}", datatype.file_extension())
}

pub fn inverted_path(dir: &Path) -> PathBuf {
    dir.join("inverted").join(format!("index.{INDEX_EXTENSION}"))
}
