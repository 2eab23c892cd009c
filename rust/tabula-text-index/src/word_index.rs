//! Word to (first block, last block) map of a postings file.
//!
//! Persisted next to the occurrences file as a sorted list of records:
//! magic `TBWI`, a big-endian `u32` count, then per word a `u16` byte length,
//! the UTF-8 bytes and the first/last block numbers as `u32`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tabula_common::{Result, error::Error, verify_data};

const MAGIC: &[u8; 4] = b"TBWI";

/// Head and tail of a word's block chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainEnds {
    pub first: u32,
    pub last: u32,
}

#[derive(Debug, Default, Clone)]
pub struct WordIndex {
    words: BTreeMap<String, ChainEnds>,
}

impl WordIndex {
    pub fn new() -> WordIndex {
        WordIndex::default()
    }

    pub fn get(&self, word: &str) -> Option<ChainEnds> {
        self.words.get(word).copied()
    }

    pub fn insert(&mut self, word: &str, ends: ChainEnds) {
        match self.words.get_mut(word) {
            Some(slot) => *slot = ends,
            None => {
                self.words.insert(word.to_string(), ends);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Words in sorted order.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.words.keys().map(String::as_str)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let context = || path.display().to_string();
        if let Some(word) = self.words.keys().find(|w| w.len() > u16::MAX as usize) {
            return Err(Error::invalid_arg(
                "word",
                format!("{} bytes exceeds the indexable length", word.len()),
            ));
        }
        let file = File::create(path).map_err(|e| Error::io(context(), e))?;
        let mut w = BufWriter::new(file);
        let write = |w: &mut BufWriter<File>| -> std::io::Result<()> {
            w.write_all(MAGIC)?;
            w.write_u32::<BigEndian>(self.words.len() as u32)?;
            for (word, ends) in &self.words {
                w.write_u16::<BigEndian>(word.len() as u16)?;
                w.write_all(word.as_bytes())?;
                w.write_u32::<BigEndian>(ends.first)?;
                w.write_u32::<BigEndian>(ends.last)?;
            }
            w.flush()
        };
        write(&mut w).map_err(|e| Error::io(context(), e))
    }

    pub fn load(path: &Path) -> Result<WordIndex> {
        let context = || path.display().to_string();
        let file = File::open(path).map_err(|e| Error::io(context(), e))?;
        let mut r = BufReader::new(file);
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic).map_err(|e| Error::io(context(), e))?;
        verify_data!(word_index_magic, &magic == MAGIC);
        let read = |r: &mut BufReader<File>| -> std::io::Result<Option<BTreeMap<String, ChainEnds>>> {
            let count = r.read_u32::<BigEndian>()?;
            let mut words = BTreeMap::new();
            for _ in 0..count {
                let len = r.read_u16::<BigEndian>()? as usize;
                let mut bytes = vec![0u8; len];
                r.read_exact(&mut bytes)?;
                let Ok(word) = String::from_utf8(bytes) else {
                    return Ok(None);
                };
                let first = r.read_u32::<BigEndian>()?;
                let last = r.read_u32::<BigEndian>()?;
                words.insert(word, ChainEnds { first, last });
            }
            Ok(Some(words))
        };
        match read(&mut r).map_err(|e| Error::io(context(), e))? {
            Some(words) => Ok(WordIndex { words }),
            None => Err(Error::invalid_format(format!(
                "{}: word is not valid UTF-8",
                context()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_save_load() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("wordidx.words");
        let mut idx = WordIndex::new();
        idx.insert("QUICK", ChainEnds { first: 1, last: 1 });
        idx.insert("FOX", ChainEnds { first: 2, last: 9 });
        idx.insert("QUICK", ChainEnds { first: 1, last: 12 });
        idx.save(&path).unwrap();

        let loaded = WordIndex::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("QUICK"), Some(ChainEnds { first: 1, last: 12 }));
        assert_eq!(loaded.words().collect::<Vec<_>>(), vec!["FOX", "QUICK"]);
        assert!(loaded.get("SLOW").is_none());
    }
}
