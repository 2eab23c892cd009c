//! Word extraction for searchable text.
//!
//! The same tokenizer runs at index build time and when query words are
//! normalized, so both sides agree on what a "word" is:
//!
//! - a word starts with an ASCII letter or digit,
//! - continues with ASCII letters, digits or apostrophes,
//! - is at least two characters long.
//!
//! Indexed words are upper-cased with apostrophes removed (see
//! [`normalize_word`]). A word's position is its ordinal among the words of
//! its row, counting from zero.

use std::str::CharIndices;

/// A tokenizer extracts words from raw text values for indexing.
pub trait Tokenizer: Send + Sync {
    /// The iterator type returned by tokenize.
    type TokenIter<'a>: Iterator<Item = &'a str>
    where
        Self: 'a;

    /// Extracts words from the input as slices of it.
    fn tokenize<'a>(&'a self, input: &'a str) -> Self::TokenIter<'a>;

    /// Name of the tokenizer, as recorded in column metadata.
    fn name(&self) -> &'static str;
}

/// The default tokenizer for searchable-text columns.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordTokenizer;

impl WordTokenizer {
    pub fn new() -> Self {
        WordTokenizer
    }

    /// Tokenizes `input` and pairs every normalized word with its position.
    pub fn positioned_words(&self, input: &str) -> Vec<(String, u32)> {
        self.tokenize(input)
            .enumerate()
            .map(|(pos, word)| (normalize_word(word), pos as u32))
            .collect()
    }
}

impl Tokenizer for WordTokenizer {
    type TokenIter<'a> = WordIter<'a>;

    fn tokenize<'a>(&'a self, input: &'a str) -> Self::TokenIter<'a> {
        WordIter {
            input,
            chars: input.char_indices(),
        }
    }

    fn name(&self) -> &'static str {
        "word"
    }
}

/// Iterator over the words of one text value.
pub struct WordIter<'a> {
    input: &'a str,
    chars: CharIndices<'a>,
}

impl<'a> Iterator for WordIter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (start, first) = self.chars.next()?;
            if !first.is_ascii_alphanumeric() {
                continue;
            }
            let mut end = start + first.len_utf8();
            let mut rest = self.chars.clone();
            while let Some((pos, ch)) = rest.next() {
                if ch.is_ascii_alphanumeric() || ch == '\'' {
                    end = pos + ch.len_utf8();
                    self.chars = rest.clone();
                } else {
                    break;
                }
            }
            if end - start >= 2 {
                return Some(&self.input[start..end]);
            }
        }
    }
}

/// Upper-cases a word and strips its apostrophes. Wildcard `*` characters in
/// query words pass through unchanged.
pub fn normalize_word(word: &str) -> String {
    word.chars()
        .filter(|&c| c != '\'')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}
