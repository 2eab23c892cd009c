//! Scratch directories for backed datasets in tests.

use std::path::PathBuf;

use tempfile::TempDir;

/// A fresh temporary directory whose name starts with `prefix`. It is
/// removed when the returned guard drops.
pub fn temp_dir(prefix: &str) -> anyhow::Result<TempDir> {
    Ok(tempfile::Builder::new().prefix(prefix).tempdir()?)
}

/// A temporary storage root together with the path datasets should be
/// created under.
pub fn storage_root() -> anyhow::Result<(TempDir, PathBuf)> {
    let dir = temp_dir("tabula-")?;
    let root = dir.path().join("datasets");
    std::fs::create_dir_all(&root)?;
    Ok((dir, root))
}
