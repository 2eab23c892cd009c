//! Spilled column chunks.
//!
//! A chunk is a run of one column's values, `bincode`-encoded and
//! zstd-compressed, in a file named `<column>_chunk_<n>`. Chunks are read
//! back in order and each file is deleted as soon as its values are taken.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tabula_common::{Result, error::Error, try_or_ret_some_err};
use tabula_store::Value;

fn bincode_config() -> impl bincode::config::Config {
    bincode::config::standard()
}

pub fn chunk_path(dir: &Path, column: &str, n: usize) -> PathBuf {
    dir.join(format!("{column}_chunk_{n}"))
}

pub fn write_chunk(path: &Path, values: &[Option<Value>], level: i32) -> Result<()> {
    let context = || path.display().to_string();
    let file = File::create(path).map_err(|e| Error::io(context(), e))?;
    let mut encoder = zstd::stream::write::Encoder::new(BufWriter::new(file), level)
        .map_err(|e| Error::io(context(), e))?;
    bincode::serde::encode_into_std_write(values, &mut encoder, bincode_config())?;
    let mut writer = encoder.finish().map_err(|e| Error::io(context(), e))?;
    writer.flush().map_err(|e| Error::io(context(), e))?;
    Ok(())
}

pub fn read_chunk(path: &Path) -> Result<Vec<Option<Value>>> {
    let file = File::open(path).map_err(|e| Error::io(path.display().to_string(), e))?;
    let mut decoder =
        zstd::stream::read::Decoder::new(file).map_err(|e| Error::io(path.display().to_string(), e))?;
    Ok(bincode::serde::decode_from_std_read(
        &mut decoder,
        bincode_config(),
    )?)
}

/// Concatenates a column's chunks lazily, one file in memory at a time.
#[derive(Debug)]
pub struct ChunkReader {
    paths: VecDeque<PathBuf>,
    current: std::vec::IntoIter<Option<Value>>,
}

impl ChunkReader {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> ChunkReader {
        ChunkReader {
            paths: paths.into_iter().collect(),
            current: Vec::new().into_iter(),
        }
    }

    /// Chunks `0..count` of `column` in `dir`.
    pub fn for_column(dir: &Path, column: &str, count: usize) -> ChunkReader {
        ChunkReader::new((0..count).map(|n| chunk_path(dir, column, n)))
    }
}

impl Iterator for ChunkReader {
    type Item = Result<Option<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(value) = self.current.next() {
                return Some(Ok(value));
            }
            let path = self.paths.pop_front()?;
            let values = try_or_ret_some_err!(read_chunk(&path));
            try_or_ret_some_err!(
                std::fs::remove_file(&path).map_err(|e| Error::io(path.display().to_string(), e))
            );
            log::trace!("consumed {} ({} values)", path.display(), values.len());
            self.current = values.into_iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.current.len(), None)
    }
}
