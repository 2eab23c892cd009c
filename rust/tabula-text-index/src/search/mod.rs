//! Text search over a postings source.

pub mod expr;
pub mod hits;
pub mod parser;

pub use expr::{ConjOp, DEFAULT_NEARNESS, SearchExpr};
pub use hits::SearchHits;
pub use parser::parse_search;

use tabula_common::Result;

use crate::postings::OccurrenceSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Window, in words, used by `<`, `>` and `~` without an explicit `[n]`.
    pub nearness: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            nearness: DEFAULT_NEARNESS,
        }
    }
}

/// Parses and evaluates `text` in one step.
pub fn search<S: OccurrenceSource + ?Sized>(
    source: &S,
    text: &str,
    options: &SearchOptions,
) -> Result<SearchHits> {
    parse_search(text, options)?.evaluate(source)
}
