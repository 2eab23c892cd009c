//! Named filters saved with a dataset.
//!
//! Each filter lives in `<dataset>/filters/<name>/` as `metadata.json` and a
//! `record_ids.bin` blob. A filter remembers the generation its rows were
//! computed against; reading it at a later generation recomputes the rows
//! from the stored expression.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tabula_common::{RowId, Result, error::Error, names::check_name_ok};
use tabula_store::persist;

use crate::dataset::write_json_atomic;

pub const FILTERS_DIR: &str = "filters";
const METADATA_FILE: &str = "metadata.json";
const RECORD_IDS_FILE: &str = "record_ids.bin";

/// Everything about a named filter except its rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterMeta {
    pub name: String,
    pub expr: String,
    pub desc: Option<String>,
    pub label: Option<String>,
    /// Dataset generation the rows belong to.
    pub generation: u64,
    /// Number of selected rows.
    pub length: usize,
}

#[derive(Debug, Clone)]
pub struct DatasetFilter {
    pub meta: FilterMeta,
    pub record_ids: Arc<Vec<RowId>>,
}

impl DatasetFilter {
    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn label(&self) -> &str {
        self.meta.label.as_deref().unwrap_or(&self.meta.expr)
    }

    pub fn is_stale(&self, generation: u64) -> bool {
        self.meta.generation != generation
    }
}

#[derive(Debug, Default)]
pub struct FilterRegistry {
    dir: Option<PathBuf>,
    filters: BTreeMap<String, DatasetFilter>,
}

impl FilterRegistry {
    /// A registry that keeps filters in memory only.
    pub fn new() -> FilterRegistry {
        FilterRegistry::default()
    }

    /// Loads every filter saved under `dataset_dir/filters`.
    pub fn load(dataset_dir: &Path) -> Result<FilterRegistry> {
        let dir = dataset_dir.join(FILTERS_DIR);
        let mut filters = BTreeMap::new();
        if dir.is_dir() {
            let entries =
                std::fs::read_dir(&dir).map_err(|e| Error::io(dir.display().to_string(), e))?;
            for entry in entries {
                let entry = entry.map_err(|e| Error::io(dir.display().to_string(), e))?;
                let path = entry.path();
                let meta_path = path.join(METADATA_FILE);
                if !meta_path.is_file() {
                    log::warn!("ignoring filter directory without metadata: {}", path.display());
                    continue;
                }
                let text = std::fs::read_to_string(&meta_path)
                    .map_err(|e| Error::io(meta_path.display().to_string(), e))?;
                let meta: FilterMeta = serde_json::from_str(&text)?;
                let record_ids: Vec<RowId> = persist::read_blob(&path.join(RECORD_IDS_FILE))?;
                filters.insert(
                    meta.name.clone(),
                    DatasetFilter {
                        meta,
                        record_ids: Arc::new(record_ids),
                    },
                );
            }
        }
        log::debug!("loaded {} filters from {}", filters.len(), dir.display());
        Ok(FilterRegistry {
            dir: Some(dir),
            filters,
        })
    }

    pub fn names(&self) -> Vec<String> {
        self.filters.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Adds or replaces a filter, saving it when the registry is backed.
    pub fn add(&mut self, filter: DatasetFilter) -> Result<()> {
        check_name_ok("filter", &filter.meta.name)?;
        if let Some(dir) = &self.dir {
            let dir = dir.join(&filter.meta.name);
            std::fs::create_dir_all(&dir).map_err(|e| Error::io(dir.display().to_string(), e))?;
            persist::write_blob(&dir.join(RECORD_IDS_FILE), filter.record_ids.as_ref())?;
            write_json_atomic(&dir.join(METADATA_FILE), &filter.meta)?;
        }
        self.filters.insert(filter.meta.name.clone(), filter);
        Ok(())
    }

    /// The filter called `name`. If its rows belong to another generation
    /// they are recomputed from its expression with `recompute` and saved
    /// again.
    pub fn get<F>(&mut self, name: &str, generation: u64, recompute: F) -> Result<DatasetFilter>
    where
        F: FnOnce(&str) -> Result<Vec<RowId>>,
    {
        let filter = self
            .filters
            .get(name)
            .ok_or_else(|| Error::filter_not_found(name))?;
        if !filter.is_stale(generation) {
            return Ok(filter.clone());
        }
        log::info!(
            "filter {name} is from generation {}, recomputing for {generation}",
            filter.meta.generation
        );
        let record_ids = recompute(&filter.meta.expr)?;
        let mut meta = filter.meta.clone();
        meta.generation = generation;
        meta.length = record_ids.len();
        let refreshed = DatasetFilter {
            meta,
            record_ids: Arc::new(record_ids),
        };
        self.add(refreshed.clone())?;
        Ok(refreshed)
    }

    pub fn delete(&mut self, name: &str) -> Result<()> {
        if self.filters.remove(name).is_none() {
            return Err(Error::filter_not_found(name));
        }
        if let Some(dir) = &self.dir {
            let dir = dir.join(name);
            if dir.exists() {
                std::fs::remove_dir_all(&dir)
                    .map_err(|e| Error::io(dir.display().to_string(), e))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_common::error::ErrorKind;
    use tempfile::TempDir;

    fn filter(name: &str, generation: u64, rows: Vec<RowId>) -> DatasetFilter {
        DatasetFilter {
            meta: FilterMeta {
                name: name.to_string(),
                expr: "sex = 'M'".to_string(),
                desc: None,
                label: Some("Males".to_string()),
                generation,
                length: rows.len(),
            },
            record_ids: Arc::new(rows),
        }
    }

    #[test]
    fn test_saved_filters_reload() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let mut registry = FilterRegistry::load(dir.path()).unwrap();
        registry.add(filter("males", 3, vec![0, 2, 3])).unwrap();

        let mut reloaded = FilterRegistry::load(dir.path()).unwrap();
        assert_eq!(reloaded.names(), vec!["males".to_string()]);
        let males = reloaded
            .get("males", 3, |_| panic!("fresh filter recomputed"))
            .unwrap();
        assert_eq!(males.record_ids.as_slice(), &[0, 2, 3]);
        assert_eq!(males.label(), "Males");

        reloaded.delete("males").unwrap();
        assert!(!dir.path().join(FILTERS_DIR).join("males").exists());
        let err = reloaded.delete("males").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::FilterNotFound { .. }));
    }

    #[test]
    fn test_stale_filter_recomputed() {
        let mut registry = FilterRegistry::new();
        registry.add(filter("males", 1, vec![0, 2, 3])).unwrap();
        let mut calls = 0;
        let refreshed = registry
            .get("males", 2, |expr| {
                calls += 1;
                assert_eq!(expr, "sex = 'M'");
                Ok(vec![1])
            })
            .unwrap();
        assert_eq!(calls, 1);
        assert_eq!(refreshed.meta.generation, 2);
        assert_eq!(refreshed.meta.length, 1);
        let again = registry.get("males", 2, |_| unreachable!()).unwrap();
        assert_eq!(again.record_ids.as_slice(), &[1]);
    }

    #[test]
    fn test_bad_name_rejected() {
        let mut registry = FilterRegistry::new();
        assert!(registry.add(filter("bad name!", 0, vec![])).is_err());
    }
}
