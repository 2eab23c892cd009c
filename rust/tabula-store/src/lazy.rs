//! Demand-loaded values with explicit load and unload transitions.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use tabula_common::Result;

/// A value that is either resident or backed by a file and loaded on first use.
///
/// `ensure_loaded` performs the load at most once and hands out a shared
/// handle; `unload` drops the resident copy so the next access re-reads the
/// file. Resident values that have no backing file cannot be unloaded.
#[derive(Debug)]
pub struct Loadable<T> {
    path: Option<PathBuf>,
    cell: OnceLock<Arc<T>>,
}

impl<T> Loadable<T> {
    /// A value held in memory with no backing file.
    pub fn resident(value: T) -> Loadable<T> {
        let cell = OnceLock::new();
        let _ = cell.set(Arc::new(value));
        Loadable { path: None, cell }
    }

    /// A value to be read from `path` on first access.
    pub fn on_disk(path: PathBuf) -> Loadable<T> {
        Loadable {
            path: Some(path),
            cell: OnceLock::new(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Returns the resident value, loading it with `load` if needed.
    ///
    /// Concurrent first accesses may both run `load`; the first result to be
    /// installed wins and the other is discarded.
    pub fn ensure_loaded<F>(&self, load: F) -> Result<Arc<T>>
    where
        F: FnOnce(&Path) -> Result<T>,
    {
        if let Some(value) = self.cell.get() {
            return Ok(value.clone());
        }
        let Some(path) = self.path.as_deref() else {
            return Err(tabula_common::error::Error::invalid_operation(
                "lazy value has neither a resident copy nor a backing file",
            ));
        };
        let value = Arc::new(load(path)?);
        let _ = self.cell.set(value);
        match self.cell.get() {
            Some(value) => Ok(value.clone()),
            None => Err(tabula_common::error::Error::invalid_operation(
                "lazy value vanished after load",
            )),
        }
    }

    /// Drops the resident copy of a file-backed value. Returns `true` when
    /// something was released.
    pub fn unload(&mut self) -> bool {
        if self.path.is_none() {
            return false;
        }
        self.cell.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_loads_once_and_unloads() {
        let loads = AtomicUsize::new(0);
        let mut lazy: Loadable<Vec<u32>> = Loadable::on_disk(PathBuf::from("/nowhere/data"));
        assert!(!lazy.is_loaded());

        let load = |_: &Path| {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1, 2, 3])
        };
        assert_eq!(*lazy.ensure_loaded(load).unwrap(), vec![1, 2, 3]);
        assert_eq!(*lazy.ensure_loaded(load).unwrap(), vec![1, 2, 3]);
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        assert!(lazy.unload());
        assert!(!lazy.is_loaded());
        lazy.ensure_loaded(load).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_resident_cannot_unload() {
        let mut lazy = Loadable::resident(5u8);
        assert!(!lazy.unload());
        assert_eq!(*lazy.ensure_loaded(|_| unreachable!()).unwrap(), 5);
    }
}
