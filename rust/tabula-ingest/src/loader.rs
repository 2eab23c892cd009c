//! The bulk loader and the dataset load entry point.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use tabula_common::{Result, error::Error};
use tabula_dataset::{Column, ColumnDef, Dataset, DatasetView, gather_multisource};
use tabula_store::{DataType, Value};
use tempfile::TempDir;

use crate::chunk::{ChunkReader, chunk_path, write_chunk};
use crate::options::IngestOptions;
use crate::source::{Record, RowSource};

/// Directory under a backed dataset that holds chunks while a load runs.
pub const CHUNKS_DIR: &str = "chunks";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Nothing pushed yet.
    Empty,
    /// Records are being buffered.
    Accumulating,
    /// Buffers are being written out as a chunk.
    Spilling,
    /// Columns are being stored.
    Finalizing,
    /// Every column is stored.
    Ready,
}

#[derive(Debug)]
enum ChunkDir {
    Scratch(TempDir),
    Dataset(PathBuf),
}

impl ChunkDir {
    fn path(&self) -> &Path {
        match self {
            ChunkDir::Scratch(dir) => dir.path(),
            ChunkDir::Dataset(path) => path,
        }
    }
}

impl Drop for ChunkDir {
    fn drop(&mut self) {
        if let ChunkDir::Dataset(path) = self {
            if path.exists() {
                if let Err(e) = std::fs::remove_dir_all(&*path) {
                    log::warn!("failed to remove chunk directory {}: {e}", path.display());
                }
            }
        }
    }
}

enum ColumnFeed {
    Memory(Vec<Option<Value>>),
    Chunks(ChunkReader),
}

/// Turns a stream of records into stored columns.
///
/// Each pushed record adds one value to every column buffer. Buffers are
/// spilled to chunk files whenever they reach `chunk_rows` rows, and
/// [`BulkLoader::finish`] stores every column from its chunks (or straight
/// from memory when nothing was spilled).
#[derive(Debug)]
pub struct BulkLoader {
    defs: Vec<ColumnDef>,
    options: IngestOptions,
    buffers: Vec<Vec<Option<Value>>>,
    chunk_root: Option<PathBuf>,
    chunk_dir: Option<ChunkDir>,
    chunks: usize,
    rows: usize,
    state: LoadState,
}

impl BulkLoader {
    /// A loader for columns `defs`. Chunks go to `chunk_root` when given,
    /// otherwise to a scratch directory; either is removed once the loader
    /// is done with it.
    pub fn new(
        defs: Vec<ColumnDef>,
        chunk_root: Option<PathBuf>,
        options: IngestOptions,
    ) -> Result<BulkLoader> {
        for def in &defs {
            def.validate()?;
        }
        Ok(BulkLoader {
            buffers: vec![Vec::new(); defs.len()],
            defs,
            options,
            chunk_root,
            chunk_dir: None,
            chunks: 0,
            rows: 0,
            state: LoadState::Empty,
        })
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    /// Records pushed so far.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Chunks spilled so far.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub fn defs(&self) -> &[ColumnDef] {
        &self.defs
    }

    fn buffered(&self) -> usize {
        self.buffers.first().map_or(0, Vec::len)
    }

    pub fn push(&mut self, record: &Record) -> Result<()> {
        if !matches!(self.state, LoadState::Empty | LoadState::Accumulating) {
            return Err(Error::invalid_operation(format!(
                "push: loader is {:?}",
                self.state
            )));
        }
        self.state = LoadState::Accumulating;
        for (def, buffer) in self.defs.iter().zip(self.buffers.iter_mut()) {
            let value = if def.multisource_cols.is_empty() {
                record.get(&def.name).cloned()
            } else {
                Some(gather_multisource(
                    def.multisource_cols.iter().map(|c| record.get(c)),
                ))
            };
            buffer.push(value);
        }
        self.rows += 1;
        if self.options.chunk_rows > 0 && self.buffered() >= self.options.chunk_rows {
            self.spill()?;
        }
        Ok(())
    }

    fn chunk_dir(&mut self) -> Result<PathBuf> {
        if let Some(dir) = &self.chunk_dir {
            return Ok(dir.path().to_path_buf());
        }
        let dir = match &self.chunk_root {
            Some(path) => {
                std::fs::create_dir_all(path)
                    .map_err(|e| Error::io(path.display().to_string(), e))?;
                ChunkDir::Dataset(path.clone())
            }
            None => ChunkDir::Scratch(
                tempfile::Builder::new()
                    .prefix("tabula-chunks-")
                    .tempdir()
                    .map_err(|e| Error::io("ingest chunk directory", e))?,
            ),
        };
        let path = dir.path().to_path_buf();
        self.chunk_dir = Some(dir);
        Ok(path)
    }

    fn spill(&mut self) -> Result<()> {
        self.state = LoadState::Spilling;
        let started = Instant::now();
        let dir = self.chunk_dir()?;
        let rows = self.buffered();
        for (def, buffer) in self.defs.iter().zip(self.buffers.iter_mut()) {
            write_chunk(
                &chunk_path(&dir, &def.name, self.chunks),
                buffer,
                self.options.compression_level,
            )?;
            buffer.clear();
        }
        log::debug!(
            "spilled chunk {} ({rows} rows, {} columns) in {:.3}s",
            self.chunks,
            self.defs.len(),
            started.elapsed().as_secs_f64()
        );
        self.chunks += 1;
        self.state = LoadState::Accumulating;
        Ok(())
    }

    /// Stores every column, each under `staging/<column>` when `staging` is
    /// given. Any column failing fails the whole call.
    pub fn finish(&mut self, staging: Option<&Path>) -> Result<Vec<Column>> {
        if !matches!(self.state, LoadState::Empty | LoadState::Accumulating) {
            return Err(Error::invalid_operation(format!(
                "finish: loader is {:?}",
                self.state
            )));
        }
        if (self.chunks > 0 || self.options.chunk_rows == 0) && self.buffered() > 0 {
            self.spill()?;
        }
        self.state = LoadState::Finalizing;
        let started = Instant::now();

        let chunk_dir = self.chunk_dir.as_ref().map(|d| d.path().to_path_buf());
        let chunks = self.chunks;
        let buffers = std::mem::take(&mut self.buffers);
        let feeds: Vec<(ColumnDef, ColumnFeed)> = self
            .defs
            .iter()
            .cloned()
            .zip(buffers)
            .map(|(def, buffer)| {
                let feed = match &chunk_dir {
                    Some(dir) if chunks > 0 => {
                        ColumnFeed::Chunks(ChunkReader::for_column(dir, &def.name, chunks))
                    }
                    _ => ColumnFeed::Memory(buffer),
                };
                (def, feed)
            })
            .collect();

        let workers = self.options.workers.min(feeds.len());
        let columns = if workers > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("tabula-ingest-{i}"))
                .build()
                .map_err(|e| Error::invalid_operation(format!("ingest worker pool: {e}")))?;
            log::info!("storing {} columns on {workers} workers", feeds.len());
            pool.install(|| {
                feeds
                    .into_par_iter()
                    .map(|(def, feed)| store_column(def, feed, staging))
                    .collect::<Result<Vec<_>>>()
            })?
        } else {
            feeds
                .into_iter()
                .map(|(def, feed)| store_column(def, feed, staging))
                .collect::<Result<Vec<_>>>()?
        };

        self.chunk_dir = None;
        self.state = LoadState::Ready;
        log::info!(
            "stored {} columns of {} rows from {chunks} chunks in {:.3}s",
            columns.len(),
            self.rows,
            started.elapsed().as_secs_f64()
        );
        Ok(columns)
    }
}

fn store_column(def: ColumnDef, feed: ColumnFeed, staging: Option<&Path>) -> Result<Column> {
    let dir = staging.map(|s| s.join(&def.name));
    match feed {
        ColumnFeed::Memory(values) => Column::store(def, values, dir.as_deref()),
        ColumnFeed::Chunks(reader) => Column::try_store(def, reader, dir.as_deref()),
    }
}

/// Outcome of a load into a new generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    /// Names of the sources, in load order.
    pub sources: Vec<String>,
    pub rows: usize,
    pub chunks: usize,
    /// The generation the rows were installed as.
    pub generation: u64,
}

/// One new generation of a dataset, filled from any number of sources.
///
/// The columns are those already defined on the dataset, or, for a dataset
/// without columns, the ones the first source declares. Rows from later
/// sources follow on from the rows of earlier ones. Backed datasets stage
/// the new columns in the next generation's directory; the generation is
/// only installed by [`DatasetLoad::finish`], once every column is stored.
/// A load that fails or is dropped unfinished removes what it staged.
pub struct DatasetLoad<'d> {
    dataset: &'d mut Dataset,
    options: IngestOptions,
    loader: Option<BulkLoader>,
    staging: Option<PathBuf>,
    chunk_root: Option<PathBuf>,
    sources: Vec<String>,
    started: Instant,
    failed: bool,
    committed: bool,
}

impl<'d> DatasetLoad<'d> {
    /// Starts a load into the next generation of `dataset`, which must be
    /// locked when backed.
    pub fn begin(dataset: &'d mut Dataset, options: &IngestOptions) -> Result<DatasetLoad<'d>> {
        dataset.assert_locked()?;
        let staging = dataset.staging_dir();
        if let Some(dir) = &staging {
            if dir.exists() {
                log::warn!("removing leftover staging directory {}", dir.display());
                std::fs::remove_dir_all(dir).map_err(|e| Error::io(dir.display().to_string(), e))?;
            }
            std::fs::create_dir_all(dir).map_err(|e| Error::io(dir.display().to_string(), e))?;
        }
        let chunk_root = dataset.path().map(|p| p.join(CHUNKS_DIR));
        Ok(DatasetLoad {
            dataset,
            options: options.clone(),
            loader: None,
            staging,
            chunk_root,
            sources: Vec::new(),
            started: Instant::now(),
            failed: false,
            committed: false,
        })
    }

    /// Rows read so far, across every source.
    pub fn rows(&self) -> usize {
        self.loader.as_ref().map_or(0, BulkLoader::rows)
    }

    /// Reads every record of `source`, up to the options' row limit counted
    /// over the whole load. Returns the number of records read from it.
    pub fn add_source<S>(&mut self, source: &mut S) -> Result<usize>
    where
        S: RowSource + ?Sized,
    {
        if self.failed {
            return Err(Error::invalid_operation(format!(
                "load of {} has already failed",
                self.dataset.name()
            )));
        }
        let read = self.read_source(source);
        if let Err(e) = &read {
            self.failed = true;
            log::warn!("load of {} from {} failed: {e}", self.dataset.name(), source.name());
        }
        read
    }

    fn read_source<S>(&mut self, source: &mut S) -> Result<usize>
    where
        S: RowSource + ?Sized,
    {
        if self.loader.is_none() {
            let defs = column_defs(self.dataset, source.columns());
            self.loader = Some(BulkLoader::new(defs, self.chunk_root.clone(), self.options.clone())?);
        }
        let Some(loader) = self.loader.as_mut() else {
            return Err(Error::invalid_operation("bulk loader missing"));
        };
        check_declared(self.dataset.name(), loader.defs(), source.name(), source.columns())?;

        let limit = self.options.row_limit.unwrap_or(usize::MAX);
        let first = loader.rows();
        let mut records = source.records();
        while loader.rows() < limit {
            match records.next() {
                Some(record) => loader.push(&record?)?,
                None => break,
            }
        }
        drop(records);
        let read = loader.rows() - first;
        log::debug!(
            "read {read} rows from {} into {} (rows {first}..{})",
            source.name(),
            self.dataset.name(),
            loader.rows()
        );
        self.sources.push(source.name().to_string());
        Ok(read)
    }

    /// Stores every column and installs the new generation.
    pub fn finish(mut self) -> Result<LoadSummary> {
        if self.failed {
            return Err(Error::invalid_operation(format!(
                "load of {} has already failed",
                self.dataset.name()
            )));
        }
        let mut loader = match self.loader.take() {
            Some(loader) => loader,
            None => BulkLoader::new(
                column_defs(self.dataset, &[]),
                self.chunk_root.clone(),
                self.options.clone(),
            )?,
        };
        let installed = loader
            .finish(self.staging.as_deref())
            .and_then(|columns| self.dataset.install_generation(loader.rows(), columns));
        if let Err(e) = installed {
            log::warn!("load of {} failed: {e}", self.dataset.name());
            return Err(e);
        }
        self.committed = true;

        let summary = LoadSummary {
            sources: std::mem::take(&mut self.sources),
            rows: loader.rows(),
            chunks: loader.chunks(),
            generation: self.dataset.generation(),
        };
        log::info!(
            "loaded {} rows from {} sources into {} generation {} in {:.3}s",
            summary.rows,
            summary.sources.len(),
            self.dataset.name(),
            summary.generation,
            self.started.elapsed().as_secs_f64()
        );
        Ok(summary)
    }
}

impl Drop for DatasetLoad<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        if let Some(dir) = &self.staging {
            if dir.exists() {
                if let Err(e) = std::fs::remove_dir_all(dir) {
                    log::warn!("failed to remove staging directory {}: {e}", dir.display());
                }
            }
        }
    }
}

/// Loads every record of `source` into a new generation of `dataset`.
pub fn load_source<S>(dataset: &mut Dataset, source: &mut S, options: &IngestOptions) -> Result<LoadSummary>
where
    S: RowSource + ?Sized,
{
    let mut load = DatasetLoad::begin(dataset, options)?;
    load.add_source(source)?;
    load.finish()
}

/// Loads `sources` one after another into a single new generation of
/// `dataset`.
pub fn load_sources<'s, I>(dataset: &mut Dataset, sources: I, options: &IngestOptions) -> Result<LoadSummary>
where
    I: IntoIterator<Item = &'s mut (dyn RowSource + 's)>,
{
    let mut load = DatasetLoad::begin(dataset, options)?;
    for source in sources {
        load.add_source(source)?;
    }
    load.finish()
}

fn column_defs(dataset: &Dataset, declared: &[(String, DataType)]) -> Vec<ColumnDef> {
    if dataset.columns().is_empty() {
        declared
            .iter()
            .map(|(name, datatype)| ColumnDef::new(name.as_str(), *datatype))
            .collect()
    } else {
        dataset.columns().iter().map(|c| c.def().clone()).collect()
    }
}

/// Fails when the source declares a column with a datatype other than the
/// column's definition.
fn check_declared(
    dataset: &str,
    defs: &[ColumnDef],
    source: &str,
    declared: &[(String, DataType)],
) -> Result<()> {
    for (name, datatype) in declared {
        match defs.iter().find(|d| &d.name == name) {
            Some(def) if def.datatype != *datatype => {
                return Err(Error::invalid_arg(
                    name,
                    format!(
                        "source {source} declares {datatype}, column in dataset '{dataset}' is {}",
                        def.datatype
                    ),
                ));
            }
            Some(_) => {}
            None => log::debug!("source {source} column {name} is not in dataset {dataset}"),
        }
    }
    for def in defs {
        let provided = declared.iter().any(|(name, _)| *name == def.name)
            || !def.multisource_cols.is_empty();
        if !provided {
            log::warn!(
                "column {} of {dataset} is not provided by source {source}, it will be null",
                def.name
            );
        }
    }
    Ok(())
}
