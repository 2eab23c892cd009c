//! Block-chained postings file.
//!
//! A [`PostingsFile`] stores, for every word of a searchable-text column, the
//! ordered list of `(row, position)` occurrences. Each word owns a chain of
//! block sequences (see [`crate::block`]); the word index records the head of
//! the chain for reads and its tail for appends. Tail sequences that are
//! being appended to are cached in memory and written back by [`flush`].
//!
//! [`flush`]: PostingsFile::flush

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use tabula_common::{RowId, Result, error::Error};

use crate::block::{
    BLOCK_SIZE, BlockHeader, HEADER_SIZE, decode_entries, encode_entries, next_size,
    size_for_entries,
};
use crate::word_index::{ChainEnds, WordIndex};

/// A source of word occurrences for search evaluation.
pub trait OccurrenceSource {
    /// All `(row, position)` pairs of `word`, ordered by row then position.
    /// Unknown words yield an empty list.
    fn occurrences(&self, word: &str) -> Result<Vec<(RowId, u32)>>;

    /// Every indexed word, sorted. Used to expand wildcards.
    fn words(&self) -> Vec<String>;
}

#[derive(Debug)]
struct TailSequence {
    header: BlockHeader,
    entries: Vec<(u32, u32)>,
    dirty: bool,
}

/// Reader/writer over an occurrences file and its word index.
#[derive(Debug)]
pub struct PostingsFile {
    file: File,
    path: PathBuf,
    index_path: PathBuf,
    words: WordIndex,
    tails: AHashMap<u32, TailSequence>,
    total_blocks: u32,
    writable: bool,
}

impl PostingsFile {
    /// Creates an empty postings file (truncating any existing one) with the
    /// sentinel block in place.
    pub fn create(path: &Path, index_path: &Path) -> Result<PostingsFile> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| Error::io(path.display().to_string(), e))?;
        file.set_len(BLOCK_SIZE as u64)
            .map_err(|e| Error::io(path.display().to_string(), e))?;
        Ok(PostingsFile {
            file,
            path: path.to_path_buf(),
            index_path: index_path.to_path_buf(),
            words: WordIndex::new(),
            tails: AHashMap::new(),
            total_blocks: 1,
            writable: true,
        })
    }

    /// Opens an existing postings file for reading.
    pub fn open(path: &Path, index_path: &Path) -> Result<PostingsFile> {
        let file = File::open(path).map_err(|e| Error::io(path.display().to_string(), e))?;
        let len = file
            .metadata()
            .map_err(|e| Error::io(path.display().to_string(), e))?
            .len();
        let words = WordIndex::load(index_path)?;
        Ok(PostingsFile {
            file,
            path: path.to_path_buf(),
            index_path: index_path.to_path_buf(),
            words,
            tails: AHashMap::new(),
            total_blocks: (len / BLOCK_SIZE as u64) as u32,
            writable: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn block_count(&self) -> u32 {
        self.total_blocks
    }

    /// Appends one occurrence of `word`.
    pub fn add_occurrence(&mut self, word: &str, row: RowId, position: u32) -> Result<()> {
        self.add_occurrences(word, &[(row, position)])
    }

    /// Appends occurrences of `word`. A new word's first sequence is sized for
    /// the whole batch.
    pub fn add_occurrences(&mut self, word: &str, entries: &[(RowId, u32)]) -> Result<()> {
        if !self.writable {
            return Err(Error::invalid_operation(format!(
                "{} is open read-only",
                self.path.display()
            )));
        }
        if entries.is_empty() {
            return Ok(());
        }
        let mut ends = match self.words.get(word) {
            Some(ends) => ends,
            None => {
                let block = self.allocate(size_for_entries(entries.len()))?;
                let ends = ChainEnds {
                    first: block,
                    last: block,
                };
                self.words.insert(word, ends);
                ends
            }
        };
        let mut remaining = entries;
        while !remaining.is_empty() {
            self.load_tail(ends.last)?;
            let (free, size) = match self.tails.get(&ends.last) {
                Some(tail) => (tail.header.capacity() - tail.entries.len(), tail.header.size),
                None => return Err(Error::invalid_operation("postings tail not cached")),
            };
            if free == 0 {
                let next = self.allocate(next_size(size))?;
                if let Some(mut full) = self.tails.remove(&ends.last) {
                    full.header.link = next;
                    self.write_sequence(ends.last, &full)?;
                }
                ends.last = next;
                self.words.insert(word, ends);
                continue;
            }
            let take = free.min(remaining.len());
            if let Some(tail) = self.tails.get_mut(&ends.last) {
                tail.entries.extend_from_slice(&remaining[..take]);
                tail.dirty = true;
            }
            remaining = &remaining[take..];
        }
        Ok(())
    }

    /// Walks the chain of `word`, returning its occurrences in append order.
    pub fn get_occurrences(&self, word: &str) -> Result<Vec<(RowId, u32)>> {
        let Some(ends) = self.words.get(word) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        let mut block = ends.first;
        let mut hops = 0u32;
        while block != 0 {
            hops += 1;
            if hops > self.total_blocks {
                return Err(Error::invalid_format(format!(
                    "{}: cyclic block chain for '{word}'",
                    self.path.display()
                )));
            }
            let link = match self.tails.get(&block) {
                Some(tail) => {
                    out.extend_from_slice(&tail.entries);
                    tail.header.link
                }
                None => {
                    let (header, entries) = self.read_sequence(block)?;
                    out.extend(entries);
                    header.link
                }
            };
            block = link;
        }
        Ok(out)
    }

    /// Indexed words in sorted order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.words.words()
    }

    /// Writes every cached tail sequence and the word index, then syncs.
    pub fn flush(&mut self) -> Result<()> {
        if !self.writable {
            return Ok(());
        }
        let mut dirty: Vec<u32> = self
            .tails
            .iter()
            .filter(|(_, t)| t.dirty)
            .map(|(&b, _)| b)
            .collect();
        dirty.sort_unstable();
        for block in dirty {
            if let Some(mut tail) = self.tails.remove(&block) {
                self.write_sequence(block, &tail)?;
                tail.dirty = false;
                self.tails.insert(block, tail);
            }
        }
        self.words.save(&self.index_path)?;
        self.file
            .sync_data()
            .map_err(|e| Error::io(self.path.display().to_string(), e))?;
        log::debug!(
            "flushed postings {}: {} words, {} blocks",
            self.path.display(),
            self.words.len(),
            self.total_blocks
        );
        Ok(())
    }

    /// Appends a fresh sequence of `size` blocks at the end of the file.
    fn allocate(&mut self, size: u32) -> Result<u32> {
        let block = self.total_blocks;
        self.total_blocks = self
            .total_blocks
            .checked_add(size)
            .ok_or_else(|| Error::invalid_operation("postings file block count overflow"))?;
        self.file
            .set_len(self.total_blocks as u64 * BLOCK_SIZE as u64)
            .map_err(|e| Error::io(self.path.display().to_string(), e))?;
        self.tails.insert(
            block,
            TailSequence {
                header: BlockHeader::new(size),
                entries: Vec::new(),
                dirty: true,
            },
        );
        Ok(block)
    }

    fn load_tail(&mut self, block: u32) -> Result<()> {
        if self.tails.contains_key(&block) {
            return Ok(());
        }
        let (header, entries) = self.read_sequence(block)?;
        self.tails.insert(
            block,
            TailSequence {
                header,
                entries,
                dirty: false,
            },
        );
        Ok(())
    }

    fn read_sequence(&self, block: u32) -> Result<(BlockHeader, Vec<(u32, u32)>)> {
        let context = || format!("{} block {block}", self.path.display());
        let mut file = &self.file;
        file.seek(SeekFrom::Start(block as u64 * BLOCK_SIZE as u64))
            .map_err(|e| Error::io(context(), e))?;
        let mut buf = [0u8; HEADER_SIZE];
        file.read_exact(&mut buf).map_err(|e| Error::io(context(), e))?;
        let header = BlockHeader::decode(&buf)?;
        let mut body = vec![0u8; header.used as usize * crate::block::ENTRY_SIZE];
        file.read_exact(&mut body).map_err(|e| Error::io(context(), e))?;
        Ok((header, decode_entries(&body)))
    }

    fn write_sequence(&self, block: u32, tail: &TailSequence) -> Result<()> {
        let context = || format!("{} block {block}", self.path.display());
        let header = BlockHeader {
            used: tail.entries.len() as u32,
            ..tail.header
        };
        let mut buf = [0u8; HEADER_SIZE];
        header.encode(&mut buf);
        let mut file = &self.file;
        file.seek(SeekFrom::Start(block as u64 * BLOCK_SIZE as u64))
            .map_err(|e| Error::io(context(), e))?;
        file.write_all(&buf).map_err(|e| Error::io(context(), e))?;
        file.write_all(&encode_entries(&tail.entries))
            .map_err(|e| Error::io(context(), e))?;
        Ok(())
    }
}

impl OccurrenceSource for PostingsFile {
    fn occurrences(&self, word: &str) -> Result<Vec<(RowId, u32)>> {
        self.get_occurrences(word)
    }

    fn words(&self) -> Vec<String> {
        self.words.words().map(str::to_string).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::entry_capacity;
    use tempfile::TempDir;

    fn paths(dir: &TempDir) -> (PathBuf, PathBuf) {
        (
            dir.path().join("occurrences.postings"),
            dir.path().join("wordidx.words"),
        )
    }

    #[test]
    fn test_create_has_sentinel() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let (occ, idx) = paths(&dir);
        let mut postings = PostingsFile::create(&occ, &idx).unwrap();
        postings.flush().unwrap();
        assert_eq!(std::fs::metadata(&occ).unwrap().len(), BLOCK_SIZE as u64);
        assert_eq!(postings.block_count(), 1);
    }

    #[test]
    fn test_add_and_get() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let (occ, idx) = paths(&dir);
        let mut postings = PostingsFile::create(&occ, &idx).unwrap();
        postings.add_occurrence("QUICK", 7, 1).unwrap();
        postings.add_occurrence("FOX", 7, 3).unwrap();
        postings.add_occurrence("QUICK", 9, 0).unwrap();
        assert_eq!(postings.get_occurrences("QUICK").unwrap(), vec![(7, 1), (9, 0)]);
        assert!(postings.get_occurrences("SLOW").unwrap().is_empty());
        postings.flush().unwrap();

        let reader = PostingsFile::open(&occ, &idx).unwrap();
        assert_eq!(reader.get_occurrences("QUICK").unwrap(), vec![(7, 1), (9, 0)]);
        assert_eq!(reader.get_occurrences("FOX").unwrap(), vec![(7, 3)]);
        assert_eq!(reader.words().collect::<Vec<_>>(), vec!["FOX", "QUICK"]);
    }

    #[test]
    fn test_chain_grows_through_size_classes() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let (occ, idx) = paths(&dir);
        let mut postings = PostingsFile::create(&occ, &idx).unwrap();
        let n = entry_capacity(1) + entry_capacity(2) + 5;
        for row in 0..n as u32 {
            postings.add_occurrence("THE", row, 0).unwrap();
        }
        postings.flush().unwrap();
        // sentinel + 1 + 2 + 4 blocks
        assert_eq!(postings.block_count(), 8);
        assert_eq!(std::fs::metadata(&occ).unwrap().len(), 8 * BLOCK_SIZE as u64);

        let reader = PostingsFile::open(&occ, &idx).unwrap();
        let occurrences = reader.get_occurrences("THE").unwrap();
        assert_eq!(occurrences.len(), n);
        assert!(occurrences.iter().enumerate().all(|(i, &(r, _))| r == i as u32));
    }

    #[test]
    fn test_batch_sizes_first_sequence() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let (occ, idx) = paths(&dir);
        let mut postings = PostingsFile::create(&occ, &idx).unwrap();
        let batch: Vec<(u32, u32)> = (0..100).map(|i| (i, 0)).collect();
        postings.add_occurrences("AND", &batch).unwrap();
        assert_eq!(postings.block_count(), 1 + 2);
        assert_eq!(postings.get_occurrences("AND").unwrap(), batch);
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let (occ, idx) = paths(&dir);
        let mut postings = PostingsFile::create(&occ, &idx).unwrap();
        postings.add_occurrence("A1", 0, 0).unwrap();
        postings.flush().unwrap();
        let mut reader = PostingsFile::open(&occ, &idx).unwrap();
        assert!(reader.add_occurrence("A1", 1, 0).is_err());
    }

    #[test]
    fn test_header_bytes_big_endian() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let (occ, idx) = paths(&dir);
        let mut postings = PostingsFile::create(&occ, &idx).unwrap();
        postings.add_occurrence("QUICK", 7, 1).unwrap();
        postings.flush().unwrap();
        let bytes = std::fs::read(&occ).unwrap();
        assert!(bytes[..BLOCK_SIZE].iter().all(|&b| b == 0));
        assert_eq!(
            &bytes[BLOCK_SIZE..BLOCK_SIZE + 20],
            &[0, 0, 0, 1, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0, 7, 0, 0, 0, 1]
        );
    }
}
