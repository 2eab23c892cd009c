//! Named, versioned collections of columns.
//!
//! A backed dataset lives in `<root>/<name>/`:
//!
//! ```text
//! metadata.json            descriptor of the current generation
//! .update_lck              writer lock
//! <generation>/<column>/   column data and indexes, one directory per generation
//! filters/<name>/          saved filters
//! ```
//!
//! Readers follow `metadata.json`, which is replaced atomically on `save`.
//! Only the lock holder may change anything.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use ahash::AHashMap;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tabula_common::{RowId, Result, error::Error, names::check_name_ok};
use tabula_store::Value;

use crate::column::{Column, ColumnDef, ROW_ORDINAL, gather_multisource};
use crate::config::{DEFAULT_GENERATIONS, StorageOptions};
use crate::filter;
use crate::lock::DatasetLock;
use crate::registry::{DatasetFilter, FilterMeta, FilterRegistry};
use crate::view::{DatasetView, FilteredDataset};

pub const METADATA_FILE: &str = "metadata.json";

/// The persisted descriptor of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMeta {
    pub name: String,
    pub label: Option<String>,
    pub desc: Option<String>,
    pub generation: u64,
    /// Generations retained on disk.
    pub generations: u32,
    pub length: usize,
    pub date_created: NaiveDateTime,
    pub date_updated: Option<NaiveDateTime>,
    pub columns: Vec<ColumnDef>,
}

#[derive(Debug)]
struct CachedFilter {
    generation: u64,
    record_ids: Arc<Vec<RowId>>,
}

/// A dataset: columns of equal length, a generation counter, and for
/// backed datasets a directory and an optional writer lock.
#[derive(Debug)]
pub struct Dataset {
    meta: DatasetMeta,
    columns: Vec<Column>,
    path: Option<PathBuf>,
    lock: Option<DatasetLock>,
    filter_cache: Mutex<AHashMap<String, CachedFilter>>,
    filters: Mutex<FilterRegistry>,
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

impl Dataset {
    /// An unbacked dataset held entirely in memory.
    pub fn new(name: impl Into<String>) -> Result<Dataset> {
        let name = name.into();
        check_name_ok("dataset", &name)?;
        Ok(Dataset {
            meta: DatasetMeta {
                name,
                label: None,
                desc: None,
                generation: 0,
                generations: DEFAULT_GENERATIONS,
                length: 0,
                date_created: now(),
                date_updated: None,
                columns: Vec::new(),
            },
            columns: Vec::new(),
            path: None,
            lock: None,
            filter_cache: Mutex::new(AHashMap::new()),
            filters: Mutex::new(FilterRegistry::new()),
        })
    }

    /// Creates a new backed dataset under `options.root` and locks it.
    pub fn create(options: &StorageOptions, name: &str) -> Result<Dataset> {
        check_name_ok("dataset", name)?;
        let path = options.dataset_path(name);
        if path.join(METADATA_FILE).exists() {
            return Err(Error::invalid_operation(format!(
                "create: dataset '{name}' already exists at {}",
                path.display()
            )));
        }
        let lock = DatasetLock::acquire(&path, name)?;
        let mut dataset = Dataset::new(name)?;
        dataset.meta.generations = options.generations;
        dataset.filters = Mutex::new(FilterRegistry::load(&path)?);
        dataset.path = Some(path);
        dataset.lock = Some(lock);
        dataset.save()?;
        log::info!("created dataset {name}");
        Ok(dataset)
    }

    /// Opens an existing backed dataset for reading. Column data loads on
    /// first access when `options.lazy` is set, otherwise immediately.
    pub fn open(options: &StorageOptions, name: &str) -> Result<Dataset> {
        check_name_ok("dataset", name)?;
        let path = options.dataset_path(name);
        let meta_path = path.join(METADATA_FILE);
        if !meta_path.is_file() {
            return Err(Error::dataset_not_found(name));
        }
        let text = std::fs::read_to_string(&meta_path)
            .map_err(|e| Error::io(meta_path.display().to_string(), e))?;
        let meta: DatasetMeta = serde_json::from_str(&text)?;
        let generation_dir = path.join(meta.generation.to_string());
        let columns: Vec<Column> = meta
            .columns
            .iter()
            .map(|def| Column::open(def.clone(), meta.length, &generation_dir.join(&def.name)))
            .collect();
        if !options.lazy {
            let started = Instant::now();
            for column in &columns {
                column.data()?;
                if column.coltype().is_discrete() {
                    column.inverted()?;
                }
            }
            log::info!(
                "loaded {} columns of {name} in {:.3}s",
                columns.len(),
                started.elapsed().as_secs_f64()
            );
        }
        let filters = FilterRegistry::load(&path)?;
        log::debug!(
            "opened dataset {name} generation {} ({} rows)",
            meta.generation,
            meta.length
        );
        Ok(Dataset {
            meta,
            columns,
            path: Some(path),
            lock: None,
            filter_cache: Mutex::new(AHashMap::new()),
            filters: Mutex::new(filters),
        })
    }

    pub fn meta(&self) -> &DatasetMeta {
        &self.meta
    }

    pub fn desc(&self) -> Option<&str> {
        self.meta.desc.as_deref()
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.meta.label = Some(label.into());
    }

    pub fn set_desc(&mut self, desc: impl Into<String>) {
        self.meta.desc = Some(desc.into());
    }

    pub fn generations(&self) -> u32 {
        self.meta.generations
    }

    pub fn is_backed(&self) -> bool {
        self.path.is_some()
    }

    /// The dataset directory, if backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    /// Takes the writer lock. Fails at once if another writer holds it.
    pub fn lock(&mut self) -> Result<()> {
        if self.lock.is_some() {
            return Ok(());
        }
        if let Some(path) = &self.path {
            let lock = DatasetLock::acquire(path, &self.meta.name)?;
            self.lock = Some(lock);
        }
        Ok(())
    }

    pub fn unlock(&mut self) {
        self.lock = None;
    }

    /// Fails unless this dataset may be modified: unbacked, or backed and
    /// locked by this handle.
    pub fn assert_locked(&self) -> Result<()> {
        if self.is_backed() && !self.is_locked() {
            return Err(Error::invalid_operation(format!(
                "dataset '{}' must be locked before it is modified",
                self.meta.name
            )));
        }
        Ok(())
    }

    /// Directory of generation `generation`, if backed.
    pub fn generation_dir(&self, generation: u64) -> Option<PathBuf> {
        self.path.as_ref().map(|p| p.join(generation.to_string()))
    }

    /// Directory of the next generation, where a bulk load stages its
    /// columns before [`Dataset::install_generation`].
    pub fn staging_dir(&self) -> Option<PathBuf> {
        self.generation_dir(self.meta.generation + 1)
    }

    /// Where the column `name` of the current generation is stored.
    pub fn column_dir(&self, name: &str) -> Option<PathBuf> {
        self.generation_dir(self.meta.generation).map(|d| d.join(name))
    }

    /// Starts a new, empty generation. Columns are dropped, the length
    /// resets to zero and generations past the retention window are
    /// deleted.
    pub fn new_generation(&mut self) -> Result<()> {
        self.assert_locked()?;
        self.columns.clear();
        self.meta.columns.clear();
        self.meta.length = 0;
        self.meta.generation += 1;
        self.meta.date_created = now();
        self.lock_cache().clear();
        log::info!(
            "dataset {} now at generation {}",
            self.meta.name,
            self.meta.generation
        );
        self.reap_generations()
    }

    fn reap_generations(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let retained = self.meta.generations.max(1) as u64;
        let keep_from = (self.meta.generation + 1).saturating_sub(retained);
        let entries = std::fs::read_dir(path).map_err(|e| Error::io(path.display().to_string(), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(path.display().to_string(), e))?;
            let old = entry
                .file_name()
                .to_str()
                .and_then(|n| n.parse::<u64>().ok())
                .filter(|g| *g < keep_from);
            if let Some(generation) = old {
                log::info!("removing generation {generation} of {}", self.meta.name);
                std::fs::remove_dir_all(entry.path())
                    .map_err(|e| Error::io(entry.path().display().to_string(), e))?;
            }
        }
        Ok(())
    }

    /// Moves to a new generation whose columns were already stored (in
    /// [`Dataset::staging_dir`] when backed), then saves.
    pub fn install_generation(&mut self, length: usize, columns: Vec<Column>) -> Result<()> {
        if let Some(bad) = columns.iter().find(|c| c.len() != length) {
            return Err(Error::invalid_arg(
                bad.name(),
                format!("column has {} rows, dataset has {length}", bad.len()),
            ));
        }
        self.new_generation()?;
        self.meta.columns = columns.iter().map(|c| c.def().clone()).collect();
        self.meta.length = length;
        self.columns = columns;
        self.save()
    }

    /// Writes the descriptor. A no-op for unbacked datasets.
    pub fn save(&mut self) -> Result<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        self.assert_locked()?;
        self.meta.date_updated = Some(now());
        self.meta.columns = self.columns.iter().map(|c| c.def().clone()).collect();
        write_json_atomic(&path.join(METADATA_FILE), &self.meta)?;
        log::debug!(
            "saved dataset {} generation {}",
            self.meta.name,
            self.meta.generation
        );
        Ok(())
    }

    /// Renames a backed dataset's directory along with the dataset.
    pub fn rename(&mut self, new_name: &str) -> Result<()> {
        check_name_ok("dataset", new_name)?;
        self.assert_locked()?;
        if let Some(path) = &self.path {
            let target = path.with_file_name(new_name);
            if target.exists() {
                return Err(Error::invalid_operation(format!(
                    "rename: dataset '{new_name}' already exists"
                )));
            }
            std::fs::rename(path, &target).map_err(|e| Error::io(path.display().to_string(), e))?;
            let generation_dir = target.join(self.meta.generation.to_string());
            for column in &mut self.columns {
                let def = column.def().clone();
                *column = Column::open(def.clone(), self.meta.length, &generation_dir.join(&def.name));
            }
            *self.filters.get_mut().unwrap_or_else(PoisonError::into_inner) =
                FilterRegistry::load(&target)?;
            self.path = Some(target);
        }
        self.meta.name = new_name.to_string();
        self.save()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    /// Adds a column whose every row is null.
    pub fn add_column(&mut self, def: ColumnDef) -> Result<()> {
        let len = self.meta.length;
        self.add_column_from_values(def, std::iter::repeat_n(None, len))
    }

    /// Stores `values` as a new column. The first column of an empty dataset
    /// sets its length; later ones must match it.
    pub fn add_column_from_values<I>(&mut self, def: ColumnDef, values: I) -> Result<()>
    where
        I: IntoIterator<Item = Option<Value>>,
    {
        self.assert_locked()?;
        if def.name == ROW_ORDINAL || self.column(&def.name).is_some() {
            return Err(Error::invalid_arg(
                &def.name,
                format!("column already exists in dataset '{}'", self.meta.name),
            ));
        }
        let dir = self.column_dir(&def.name);
        let column = Column::store(def, values, dir.as_deref())?;
        if !self.columns.is_empty() && column.len() != self.meta.length {
            let err = Error::invalid_arg(
                column.name(),
                format!(
                    "column has {} rows, dataset '{}' has {}",
                    column.len(),
                    self.meta.name,
                    self.meta.length
                ),
            );
            if let Some(dir) = dir {
                let _ = std::fs::remove_dir_all(dir);
            }
            return Err(err);
        }
        self.meta.length = column.len();
        self.meta.columns.push(column.def().clone());
        self.columns.push(column);
        Ok(())
    }

    /// Adds a column computed row by row from the values of `sources`.
    pub fn add_derived_column<F>(&mut self, def: ColumnDef, sources: &[&str], mut derive: F) -> Result<()>
    where
        F: FnMut(&[Option<Value>]) -> Option<Value>,
    {
        let data = sources
            .iter()
            .map(|name| {
                self.column(name)
                    .ok_or_else(|| Error::column_not_found(&self.meta.name, *name))?
                    .data()
            })
            .collect::<Result<Vec<_>>>()?;
        let mut row = Vec::with_capacity(data.len());
        let values: Vec<Option<Value>> = (0..self.meta.length)
            .map(|i| {
                row.clear();
                row.extend(data.iter().map(|d| d.get(i)));
                derive(&row)
            })
            .collect();
        self.add_column_from_values(def, values)
    }

    /// Adds a tuple column gathering, per row, the non-null values of the
    /// columns named in `def.multisource_cols`.
    pub fn add_multisource_column(&mut self, def: ColumnDef) -> Result<()> {
        if def.multisource_cols.is_empty() {
            return Err(Error::invalid_arg(&def.name, "no source columns given"));
        }
        let sources: Vec<String> = def.multisource_cols.clone();
        let sources: Vec<&str> = sources.iter().map(String::as_str).collect();
        self.add_derived_column(def, &sources, |row| {
            Some(gather_multisource(row.iter().map(Option::as_ref)))
        })
    }

    pub fn rename_column(&mut self, old: &str, new: &str) -> Result<()> {
        self.assert_locked()?;
        check_name_ok("column", new)?;
        if new == ROW_ORDINAL || self.column(new).is_some() {
            return Err(Error::invalid_arg(new, "column already exists"));
        }
        let length = self.meta.length;
        let dataset = self.meta.name.clone();
        let old_dir = self.column_dir(old);
        let new_dir = self.column_dir(new);
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name() == old)
            .ok_or_else(|| Error::column_not_found(dataset, old))?;
        let mut def = column.def().clone();
        def.name = new.to_string();
        match (old_dir, new_dir) {
            (Some(old_dir), Some(new_dir)) => {
                column.unload();
                std::fs::rename(&old_dir, &new_dir)
                    .map_err(|e| Error::io(old_dir.display().to_string(), e))?;
                *column = Column::open(def, length, &new_dir);
            }
            _ => column.set_def(def),
        }
        self.meta.columns = self.columns.iter().map(|c| c.def().clone()).collect();
        self.lock_cache().clear();
        Ok(())
    }

    pub fn delete_column(&mut self, name: &str) -> Result<()> {
        self.assert_locked()?;
        let pos = self
            .columns
            .iter()
            .position(|c| c.name() == name)
            .ok_or_else(|| Error::column_not_found(&self.meta.name, name))?;
        self.columns.remove(pos);
        self.meta.columns.retain(|d| d.name != name);
        if let Some(dir) = self.column_dir(name) {
            if dir.exists() {
                std::fs::remove_dir_all(&dir).map_err(|e| Error::io(dir.display().to_string(), e))?;
            }
        }
        self.lock_cache().clear();
        Ok(())
    }

    /// Drops every loaded column array and index. Returns how many columns
    /// released something.
    pub fn unload(&mut self) -> usize {
        self.columns.iter_mut().map(Column::unload).filter(|released| *released).count()
    }

    pub fn describe(&self) -> DatasetDescription<'_> {
        DatasetDescription { dataset: self }
    }

    fn lock_cache(&self) -> MutexGuard<'_, AHashMap<String, CachedFilter>> {
        self.filter_cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_filters(&self) -> MutexGuard<'_, FilterRegistry> {
        self.filters.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rows matching `expr`, memoised per expression until the generation
    /// moves.
    pub fn anonymous_filter(&self, expr: &str) -> Result<Arc<Vec<RowId>>> {
        if let Some(cached) = self.lock_cache().get(expr) {
            if cached.generation == self.meta.generation {
                return Ok(cached.record_ids.clone());
            }
        }
        let record_ids = Arc::new(filter::evaluate_str(self, expr, None)?);
        self.lock_cache().insert(
            expr.to_string(),
            CachedFilter {
                generation: self.meta.generation,
                record_ids: record_ids.clone(),
            },
        );
        Ok(record_ids)
    }

    /// Evaluates `expr` and registers the result as the filter `name`.
    pub fn define_filter(
        &self,
        name: &str,
        expr: &str,
        label: Option<&str>,
        desc: Option<&str>,
    ) -> Result<DatasetFilter> {
        check_name_ok("filter", name)?;
        let record_ids = filter::evaluate_str(self, expr, None)?;
        let filter = DatasetFilter {
            meta: FilterMeta {
                name: name.to_string(),
                expr: expr.to_string(),
                desc: desc.map(str::to_string),
                label: label.map(str::to_string),
                generation: self.meta.generation,
                length: record_ids.len(),
            },
            record_ids: Arc::new(record_ids),
        };
        self.lock_filters().add(filter.clone())?;
        Ok(filter)
    }

    /// The saved filter `name`, recomputed first if the dataset has moved
    /// to a new generation since it was evaluated.
    pub fn get_filter(&self, name: &str) -> Result<DatasetFilter> {
        self.lock_filters().get(name, self.meta.generation, |expr| {
            filter::evaluate_str(self, expr, None)
        })
    }

    pub fn delete_filter(&self, name: &str) -> Result<()> {
        self.lock_filters().delete(name)
    }

    pub fn filter_names(&self) -> Vec<String> {
        self.lock_filters().names()
    }

    /// A view selected by a saved or ad hoc filter.
    ///
    /// With `expr`, the expression is evaluated (and saved as `name` when a
    /// name is given). With only `name`, the saved filter is used.
    pub fn filter_dataset(&self, name: Option<&str>, expr: Option<&str>) -> Result<FilteredDataset<'_>> {
        let (record_ids, label, desc) = match (name, expr) {
            (Some(name), Some(expr)) => {
                let filter = self.define_filter(name, expr, None, None)?;
                (filter.record_ids, expr.to_string(), Some(expr.to_string()))
            }
            (None, Some(expr)) => (self.anonymous_filter(expr)?, expr.to_string(), Some(expr.to_string())),
            (Some(name), None) => {
                let filter = self.get_filter(name)?;
                let label = filter.label().to_string();
                (filter.record_ids, label, filter.meta.desc)
            }
            (None, None) => {
                return Err(Error::invalid_arg(
                    "filter_dataset",
                    "a filter name or expression is required",
                ));
            }
        };
        let view = FilteredDataset::new(self, record_ids, self.meta.name.clone(), label);
        Ok(match desc {
            Some(desc) => view.with_desc(desc),
            None => view,
        })
    }
}

impl DatasetView for Dataset {
    fn name(&self) -> &str {
        &self.meta.name
    }

    fn label(&self) -> &str {
        self.meta.label.as_deref().unwrap_or(&self.meta.name)
    }

    fn len(&self) -> usize {
        self.meta.length
    }

    fn generation(&self) -> u64 {
        self.meta.generation
    }

    fn root(&self) -> &Dataset {
        self
    }

    fn record_ids(&self) -> Option<&[RowId]> {
        None
    }
}

/// Human-readable summary of a dataset, see [`Dataset::describe`].
pub struct DatasetDescription<'a> {
    dataset: &'a Dataset,
}

impl fmt::Display for DatasetDescription<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ds = self.dataset;
        let meta = &ds.meta;
        writeln!(f, "Dataset:     {}", meta.name)?;
        writeln!(f, "Label:       {}", ds.label())?;
        if let Some(desc) = &meta.desc {
            writeln!(f, "Description: {desc}")?;
        }
        writeln!(f, "Records:     {}", meta.length)?;
        writeln!(f, "Generation:  {}", meta.generation)?;
        match &ds.path {
            Some(path) => {
                writeln!(f, "Path:        {}", path.display())?;
                writeln!(f, "Generations retained: {}", meta.generations)?;
            }
            None => writeln!(f, "Path:        (unbacked)")?,
        }
        writeln!(f, "Created:     {}", meta.date_created.format("%Y-%m-%d %H:%M:%S"))?;
        if let Some(updated) = meta.date_updated {
            writeln!(f, "Updated:     {}", updated.format("%Y-%m-%d %H:%M:%S"))?;
        }
        writeln!(f, "Columns:")?;
        for column in &ds.columns {
            let def = column.def();
            writeln!(
                f,
                "  {:<20} {:<14} {:<10} {}",
                def.name,
                def.coltype,
                def.datatype,
                def.label()
            )?;
        }
        Ok(())
    }
}

/// Writes `value` as JSON next to `path` and renames it into place.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| Error::io(dir.display().to_string(), e))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| Error::io(dir.display().to_string(), e))?;
    serde_json::to_writer_pretty(&mut tmp, value)?;
    tmp.persist(path)
        .map_err(|e| Error::io(path.display().to_string(), e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_common::error::ErrorKind;
    use tabula_store::{ColType, DataType};

    fn strs(values: &[&str]) -> Vec<Option<Value>> {
        values.iter().map(|v| Some(Value::str(*v))).collect()
    }

    #[test]
    fn test_length_checked() {
        let mut ds = Dataset::new("test").unwrap();
        ds.add_column_from_values(ColumnDef::new("a", DataType::Str), strs(&["x", "y"]))
            .unwrap();
        assert_eq!(ds.len(), 2);
        let err = ds
            .add_column_from_values(ColumnDef::new("b", DataType::Str), strs(&["x"]))
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
        assert!(ds
            .add_column_from_values(ColumnDef::new("a", DataType::Str), strs(&["x", "y"]))
            .is_err());
        ds.add_column(ColumnDef::new("empty", DataType::Int)).unwrap();
        assert_eq!(ds.column("empty").unwrap().data().unwrap().get(1), None);
    }

    #[test]
    fn test_derived_and_multisource() {
        let mut ds = Dataset::new("test").unwrap();
        ds.add_column_from_values(ColumnDef::new("d1", DataType::Str), strs(&["a", "b", "c"]))
            .unwrap();
        ds.add_column_from_values(
            ColumnDef::new("d2", DataType::Str),
            vec![Some(Value::str("c")), None, Some(Value::str("c"))],
        )
        .unwrap();
        ds.add_multisource_column(
            ColumnDef::new("diags", DataType::Tuple)
                .with_multisource(vec!["d1".to_string(), "d2".to_string()]),
        )
        .unwrap();
        let diags = ds.column("diags").unwrap();
        let index = diags.inverted().unwrap();
        assert_eq!(index.get(&Value::str("c")), &[0, 2]);
        assert_eq!(
            diags.data().unwrap().get(1),
            Some(Value::Tuple(vec![Value::str("b")]))
        );

        ds.add_derived_column(
            ColumnDef::new("same", DataType::Int),
            &["d1", "d2"],
            |row| Some(Value::Int((row[0] == row[1]) as i64)),
        )
        .unwrap();
        let same = ds.column("same").unwrap().data().unwrap();
        assert_eq!(same.get(2), Some(Value::Int(1)));
        assert_eq!(same.get(0), Some(Value::Int(0)));
    }

    #[test]
    fn test_rename_and_delete() {
        let mut ds = Dataset::new("test").unwrap();
        ds.add_column_from_values(
            ColumnDef::new("sex", DataType::Str).with_coltype(ColType::Categorical),
            strs(&["M", "F"]),
        )
        .unwrap();
        assert_eq!(ds.filter("sex = 'F'").unwrap().len(), 1);
        ds.rename_column("sex", "gender").unwrap();
        assert!(ds.filter("sex = 'F'").is_err());
        assert_eq!(ds.filter("gender = 'F'").unwrap().len(), 1);
        ds.delete_column("gender").unwrap();
        assert!(ds.column_names().is_empty());
    }

    #[test]
    fn test_describe() {
        let mut ds = Dataset::new("nhds").unwrap();
        ds.set_label("Hospital discharges");
        ds.add_column_from_values(ColumnDef::new("sex", DataType::Str), strs(&["M"]))
            .unwrap();
        let text = ds.describe().to_string();
        assert!(text.contains("Hospital discharges"));
        assert!(text.contains("categorical"));
        assert!(text.contains("(unbacked)"));
    }
}
