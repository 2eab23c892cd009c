//! Set algebra over sorted, duplicate-free row-id slices.
//!
//! Every filter result, inverted-index entry and text-search hit list is a
//! strictly increasing sequence of [`RowId`]s. These helpers combine such
//! sequences with linear merges and preserve that ordering.

use itertools::{EitherOrBoth, Itertools};

use crate::RowId;

/// Rows present in both `a` and `b`.
pub fn intersect(a: &[RowId], b: &[RowId]) -> Vec<RowId> {
    a.iter()
        .merge_join_by(b.iter(), |x, y| x.cmp(y))
        .filter_map(|e| match e {
            EitherOrBoth::Both(x, _) => Some(*x),
            _ => None,
        })
        .collect()
}

/// Rows present in either `a` or `b`.
pub fn union(a: &[RowId], b: &[RowId]) -> Vec<RowId> {
    a.iter()
        .merge_join_by(b.iter(), |x, y| x.cmp(y))
        .map(|e| match e {
            EitherOrBoth::Both(x, _) | EitherOrBoth::Left(x) | EitherOrBoth::Right(x) => *x,
        })
        .collect()
}

/// Rows present in `a` but not in `b`.
pub fn difference(a: &[RowId], b: &[RowId]) -> Vec<RowId> {
    a.iter()
        .merge_join_by(b.iter(), |x, y| x.cmp(y))
        .filter_map(|e| match e {
            EitherOrBoth::Left(x) => Some(*x),
            _ => None,
        })
        .collect()
}

/// Union of any number of sorted sets.
pub fn union_all<'a, I>(sets: I) -> Vec<RowId>
where
    I: IntoIterator<Item = &'a [RowId]>,
{
    let mut merged: Vec<RowId> = sets.into_iter().kmerge().copied().collect();
    merged.dedup();
    merged
}

/// Rows in `0..len` that are not in `a`.
pub fn complement(len: usize, a: &[RowId]) -> Vec<RowId> {
    let mut out = Vec::with_capacity(len.saturating_sub(a.len()));
    let mut excluded = a.iter().peekable();
    for row in 0..len as RowId {
        if excluded.next_if_eq(&&row).is_none() {
            out.push(row);
        }
    }
    out
}

/// Sorts and de-duplicates an arbitrary list of rows.
pub fn normalize(mut rows: Vec<RowId>) -> Vec<RowId> {
    rows.sort_unstable();
    rows.dedup();
    rows
}

/// Whether `rows` is strictly increasing.
pub fn is_normalized(rows: &[RowId]) -> bool {
    rows.windows(2).all(|w| w[0] < w[1])
}

/// Maps parent row ids onto positions within `selection`, dropping rows the
/// selection does not contain. Both inputs must be sorted.
pub fn localize(rows: &[RowId], selection: &[RowId]) -> Vec<RowId> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    for &row in rows {
        while pos < selection.len() && selection[pos] < row {
            pos += 1;
        }
        if pos == selection.len() {
            break;
        }
        if selection[pos] == row {
            out.push(pos as RowId);
        }
    }
    out
}
