//! Advisory, non-blocking writer lock on a dataset directory.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use tabula_common::{Result, error::Error};

pub const LOCK_FILE_NAME: &str = ".update_lck";

/// An exclusive lock on `<dataset>/.update_lck`, released on drop.
#[derive(Debug)]
pub struct DatasetLock {
    file: File,
    path: PathBuf,
}

impl DatasetLock {
    /// Takes the lock without waiting. Fails with `DatasetLocked` when another
    /// writer holds it.
    pub fn acquire(dataset_dir: &Path, dataset_name: &str) -> Result<DatasetLock> {
        std::fs::create_dir_all(dataset_dir)
            .map_err(|e| Error::io(dataset_dir.display().to_string(), e))?;
        let path = dataset_dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::io(path.display().to_string(), e))?;
        try_lock_exclusive(&file).map_err(|e| {
            if e.kind() == std::io::ErrorKind::WouldBlock {
                Error::dataset_locked(dataset_name)
            } else {
                Error::io(path.display().to_string(), e)
            }
        })?;
        log::debug!("locked dataset {dataset_name} ({})", path.display());
        Ok(DatasetLock { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for DatasetLock {
    fn drop(&mut self) {
        unlock(&self.file);
        log::debug!("released {}", self.path.display());
    }
}

#[cfg(unix)]
fn try_lock_exclusive(file: &File) -> std::io::Result<()> {
    use std::os::unix::io::AsRawFd;
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(unix)]
fn unlock(file: &File) {
    use std::os::unix::io::AsRawFd;
    unsafe {
        libc::flock(file.as_raw_fd(), libc::LOCK_UN);
    }
}

#[cfg(not(unix))]
fn try_lock_exclusive(_file: &File) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "dataset locking requires a unix platform",
    ))
}

#[cfg(not(unix))]
fn unlock(_file: &File) {}
