//! Storage configuration for backed datasets.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tabula_common::{Result, error::Error};

/// Number of generation directories kept on disk when none is configured.
pub const DEFAULT_GENERATIONS: u32 = 24;

/// Where and how backed datasets are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageOptions {
    /// Directory under which each dataset gets its own subdirectory.
    pub root: PathBuf,
    /// Generations retained before older ones are deleted.
    pub generations: u32,
    /// Load column data on first access instead of when the dataset opens.
    pub lazy: bool,
}

impl Default for StorageOptions {
    fn default() -> Self {
        StorageOptions {
            root: PathBuf::from("."),
            generations: DEFAULT_GENERATIONS,
            lazy: true,
        }
    }
}

impl StorageOptions {
    pub fn new(root: impl Into<PathBuf>) -> StorageOptions {
        StorageOptions {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Generations to retain; at least the current one is always kept.
    pub fn with_generations(mut self, generations: u32) -> Self {
        self.generations = generations.max(1);
        self
    }

    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    /// Reads options from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<StorageOptions> {
        let text =
            std::fs::read_to_string(path).map_err(|e| Error::io(path.display().to_string(), e))?;
        let options: StorageOptions = serde_json::from_str(&text)?;
        if options.generations == 0 {
            return Err(Error::invalid_arg(
                "generations",
                "at least one generation must be retained",
            ));
        }
        Ok(options)
    }

    /// Directory of the dataset called `name`.
    pub fn dataset_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_json_defaults() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("storage.json");
        std::fs::write(&path, r#"{"root": "/data/tabula"}"#).unwrap();
        let options = StorageOptions::from_json_file(&path).unwrap();
        assert_eq!(options.root, PathBuf::from("/data/tabula"));
        assert_eq!(options.generations, DEFAULT_GENERATIONS);
        assert!(options.lazy);
    }

    #[test]
    fn test_current_generation_always_retained() {
        let options = StorageOptions::new("/data/tabula").with_generations(0);
        assert_eq!(options.generations, 1);
        assert_eq!(options.with_generations(3).generations, 3);
    }

    #[test]
    fn test_zero_generations_rejected() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("storage.json");
        std::fs::write(&path, r#"{"generations": 0}"#).unwrap();
        assert!(StorageOptions::from_json_file(&path).is_err());
    }
}
