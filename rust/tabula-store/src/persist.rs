//! Persisted form of column arrays and other serde-encoded blobs.
//!
//! Files are written with `bincode` in fixed-int mode behind a four byte magic
//! and a one byte format version. Encoding is deterministic, so equal arrays
//! always produce byte-identical files.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use tabula_common::{RowId, Result, error::Error, verify_data};

use crate::array::ValueArray;
use crate::datatype::DataType;
use crate::lazy::Loadable;

const MAGIC: &[u8; 4] = b"TBLA";
const FORMAT_VERSION: u8 = 1;

fn bincode_config() -> impl bincode::config::Config {
    bincode::config::standard().with_fixed_int_encoding()
}

/// Serializes `value` to `path`, replacing any existing file.
pub fn write_blob<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::io(path.display().to_string(), e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(MAGIC)
        .and_then(|_| writer.write_all(&[FORMAT_VERSION]))
        .map_err(|e| Error::io(path.display().to_string(), e))?;
    bincode::serde::encode_into_std_write(value, &mut writer, bincode_config())?;
    writer
        .flush()
        .map_err(|e| Error::io(path.display().to_string(), e))?;
    Ok(())
}

/// Reads a blob previously written by [`write_blob`].
pub fn read_blob<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| Error::io(path.display().to_string(), e))?;
    let mut reader = BufReader::new(file);
    let mut header = [0u8; 5];
    reader
        .read_exact(&mut header)
        .map_err(|e| Error::io(path.display().to_string(), e))?;
    verify_data!(header, &header[..4] == MAGIC);
    verify_data!(version, header[4] == FORMAT_VERSION);
    Ok(bincode::serde::decode_from_std_read(
        &mut reader,
        bincode_config(),
    )?)
}

#[derive(serde::Serialize, serde::Deserialize)]
struct StoredArray {
    datatype: DataType,
    array: ValueArray,
}

#[derive(serde::Serialize)]
struct StoredArrayRef<'a> {
    datatype: DataType,
    array: &'a ValueArray,
}

/// Handle to a column's stored data: resident for unbacked datasets,
/// demand-loaded from its data file otherwise.
pub type ArrayHandle = Loadable<ValueArray>;

/// Stores a finished array.
///
/// With `path == None` the array stays resident and nothing touches the disk.
/// Otherwise the array is written to `path` and a lazy handle is returned that
/// re-reads the file on first access.
pub fn store(datatype: DataType, array: ValueArray, path: Option<&Path>) -> Result<ArrayHandle> {
    match path {
        None => Ok(Loadable::resident(array)),
        Some(path) => {
            write_blob(
                path,
                &StoredArrayRef {
                    datatype,
                    array: &array,
                },
            )?;
            log::debug!("stored {} {datatype} rows to {}", array.len(), path.display());
            Ok(Loadable::on_disk(path.to_path_buf()))
        }
    }
}

/// Reads an array file, checking it holds the expected datatype.
pub fn load(datatype: DataType, path: &Path) -> Result<ValueArray> {
    let stored: StoredArray = read_blob(path)?;
    if stored.datatype != datatype {
        return Err(Error::invalid_format(format!(
            "{}: expected {datatype} data, found {}",
            path.display(),
            stored.datatype
        )));
    }
    Ok(stored.array)
}

/// A lazy handle over an existing data file.
pub fn open(path: PathBuf) -> ArrayHandle {
    Loadable::on_disk(path)
}

/// Gathers `row_ids` from the array behind `handle`, loading it if needed.
pub fn take(datatype: DataType, handle: &ArrayHandle, row_ids: &[RowId]) -> Result<ValueArray> {
    let array = handle.ensure_loaded(|path| load(datatype, path))?;
    if let Some(&bad) = row_ids.iter().find(|&&r| r as usize >= array.len()) {
        return Err(Error::invalid_arg(
            "row_ids",
            format!("row {bad} out of range for {} rows", array.len()),
        ));
    }
    Ok(array.take(row_ids))
}
