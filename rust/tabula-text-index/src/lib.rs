//! Word postings for searchable-text columns.
//!
//! A searchable-text column keeps, next to its string data, two files:
//!
//! - `occurrences.*`: a [`PostingsFile`] of 512-byte blocks holding chains of
//!   big-endian `(row, position)` pairs, one chain per word;
//! - `wordidx.*`: the [`WordIndex`] mapping each word to the first and last
//!   block of its chain.
//!
//! Words are extracted by [`WordTokenizer`] and searched with the small
//! expression language in [`search`].

pub mod block;
pub mod postings;
pub mod search;
pub mod tokenizer;
pub mod word_index;

pub use postings::{OccurrenceSource, PostingsFile};
pub use search::{SearchExpr, SearchHits, SearchOptions, parse_search};
pub use tokenizer::{Tokenizer, WordTokenizer, normalize_word};
pub use word_index::WordIndex;

use tabula_common::{RowId, Result};

/// Indexes one text value: every word of `text` is appended at `row`.
pub fn index_text(postings: &mut PostingsFile, row: RowId, text: &str) -> Result<()> {
    for (word, position) in WordTokenizer.positioned_words(text) {
        postings.add_occurrence(&word, row, position)?;
    }
    Ok(())
}
