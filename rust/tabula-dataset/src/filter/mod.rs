//! The filter expression language: lexing, parsing, operator capabilities
//! and evaluation to row sets.

pub mod eval;
pub mod lexer;
pub mod ops;
pub mod parser;
pub mod reldate;

use std::time::Instant;

use tabula_common::{RowId, Result};

pub use eval::{evaluate, evaluate_with};
pub use ops::{Operator, OperatorSupport};
pub use parser::{FilterExpr, Literal, parse_filter, parse_filter_at};

use crate::view::DatasetView;

/// Parses and evaluates `text` over `view`, returning sorted local rows.
pub fn evaluate_str<V>(view: &V, text: &str, candidates: Option<&[RowId]>) -> Result<Vec<RowId>>
where
    V: DatasetView + ?Sized,
{
    let started = Instant::now();
    let expr = parse_filter(text)?;
    let rows = evaluate(view, &expr, candidates)?;
    log::info!(
        "assembled filter {:?} on {} ({} of {} rows) in {:.3}s",
        text,
        view.name(),
        rows.len(),
        view.len(),
        started.elapsed().as_secs_f64()
    );
    Ok(rows)
}
